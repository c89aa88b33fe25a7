use std::sync::Arc;

use mania_compiler::SimpleCompiler;
use mania_core::{Bindings, Code, CoreError, FunctionData, Instruction, Scope, Symbol, Value};
use num_traits::ToPrimitive;

use crate::colon_path;
use crate::error::VmError;
use crate::host::{Host, ModuleLookup};
use crate::step::Step;
use crate::Frame;

/// One process's fetch-decode-execute loop. Grounded on `mania/vm.py`'s
/// `VM`: a single suspended `Frame` chain plus whatever the `Host`
/// (`mania-runtime`'s `Process`) supplies for the instructions that
/// reach outside this process — module lookup, messaging, spawning.
pub struct Vm {
    pub frame: Frame,
    pub host: Arc<dyn Host>,
}

impl Vm {
    pub fn new(frame: Frame, host: Arc<dyn Host>) -> Vm {
        Vm { frame, host }
    }

    /// Runs up to `ticks` instructions, stopping early on anything other
    /// than `Step::Continue`. Returns the terminating step and the
    /// number of ticks actually consumed, mirroring `VM.run`'s budget
    /// accounting for the Scheduler's priority bookkeeping (§4.6).
    pub fn run(&mut self, ticks: u32) -> Result<(Step, u32), VmError> {
        for consumed in 0..ticks {
            match self.tick()? {
                Step::Continue => continue,
                other => return Ok((other, consumed + 1)),
            }
        }
        Ok((Step::Continue, ticks))
    }

    pub fn tick(&mut self) -> Result<Step, VmError> {
        let start = self.frame.position;
        let (instr, next) = mania_core::Instruction::decode(&self.frame.code.module.instructions, start).map_err(CoreError::from)?;
        self.frame.position = next;

        if let Some(step) = self.dispatch(instr, start)? {
            return Ok(step);
        }

        if let Some(step) = self.terminal_check() {
            return Ok(step);
        }
        Ok(Step::Continue)
    }

    /// Runs one decoded instruction. `Ok(Some(step))` short-circuits
    /// `tick` with that step (the instruction already fully handled its
    /// own frame transition, or the process is done); `Ok(None)` means
    /// fall through to the generic terminal-window check. `start` is the
    /// position this instruction was fetched from, used to rewind for
    /// instructions that suspend and expect to re-run unchanged.
    fn dispatch(&mut self, instr: Instruction, start: u32) -> Result<Option<Step>, VmError> {
        use Instruction as I;
        match instr {
            I::Nop => {}

            I::Duplicate(n) => self.duplicate(n)?,
            I::Rotate(n) => self.rotate(n)?,
            I::Pop(n) => {
                for _ in 0..n {
                    self.pop()?;
                }
            }
            I::Store(i) => {
                let name = self.constant_symbol(i)?;
                let value = self.pop()?;
                self.frame.scope.define(name, value);
            }
            I::Load(i) => {
                let name = self.constant_symbol(i)?;
                let value = self
                    .frame
                    .scope
                    .lookup(&name)
                    .or_else(|| colon_path::resolve(&self.frame.scope, &name))
                    .ok_or_else(|| VmError::Name(name))?;
                self.frame.push(value);
            }
            I::LoadField(i) => {
                let field = self.constant_symbol(i)?;
                let module_value = self.pop()?;
                let module = match module_value {
                    Value::Module(m) => m,
                    other => {
                        return Err(CoreError::TypeError {
                            expected: "module",
                            found: other.type_name(),
                        }
                        .into())
                    }
                };
                let exports = module.scope.lock().unwrap().clone();
                let value = exports
                    .and_then(|s| s.lookup_local(&field))
                    .ok_or_else(|| VmError::Name(field))?;
                self.frame.push(value);
            }
            I::LoadConstant(i) => {
                let value = self.frame.code.module.constant(i).map_err(CoreError::from)?.clone();
                self.frame.push(value);
            }
            I::LoadCode(entry, size) => {
                self.frame.push(Value::Code(Code {
                    module: Arc::clone(&self.frame.code.module),
                    entry_point: entry,
                    size,
                }));
            }
            I::LoadModule(i) => {
                let name = self.constant_symbol(i)?;
                match self.host.lookup_module(&name) {
                    ModuleLookup::Ready(module) => self.frame.push(Value::Module(module)),
                    ModuleLookup::Deferred => {
                        self.frame.position = start;
                        return Ok(Some(Step::NeedsModule(name)));
                    }
                    ModuleLookup::Unknown => return Err(VmError::Name(name)),
                }
            }

            I::Negate => {
                let v = self.pop()?;
                self.frame.push(mania_core::arithmetic::negate(&v)?);
            }
            I::Add => self.binop(mania_core::arithmetic::add)?,
            I::Sub => self.binop(mania_core::arithmetic::sub)?,
            I::Mul => self.binop(mania_core::arithmetic::mul)?,
            I::Div => self.binop(mania_core::arithmetic::div)?,
            I::Pow => self.binop(mania_core::arithmetic::pow)?,
            I::Mod => self.binop(mania_core::arithmetic::modulo)?,
            I::Rem => self.binop(mania_core::arithmetic::remainder)?,
            I::Round => {
                let v = self.pop()?;
                self.frame.push(mania_core::arithmetic::round(&v)?);
            }
            I::Floor => {
                let v = self.pop()?;
                self.frame.push(mania_core::arithmetic::floor(&v)?);
            }
            I::Ceil => {
                let v = self.pop()?;
                self.frame.push(mania_core::arithmetic::ceil(&v)?);
            }

            I::BitNot => {
                let v = self.pop()?;
                self.frame.push(mania_core::arithmetic::bit_not(&v)?);
            }
            I::BitAnd => self.binop(mania_core::arithmetic::bit_and)?,
            I::BitOr => self.binop(mania_core::arithmetic::bit_or)?,
            I::BitXor => self.binop(mania_core::arithmetic::bit_xor)?,
            I::BitShiftLeft => self.binop(mania_core::arithmetic::bit_shift_left)?,
            I::BitShiftRight => self.binop(mania_core::arithmetic::bit_shift_right)?,

            I::LogicNot => {
                let v = self.pop()?;
                self.frame.push(Value::Bool(!v.is_truthy()));
            }
            I::LogicAnd => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.frame.push(Value::Bool(a.is_truthy() && b.is_truthy()));
            }
            I::LogicOr => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.frame.push(Value::Bool(a.is_truthy() || b.is_truthy()));
            }
            I::LogicXor => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.frame.push(Value::Bool(a.is_truthy() ^ b.is_truthy()));
            }
            I::Type => {
                let v = self.pop()?;
                self.frame.push(Value::symbol(v.type_name()));
            }
            I::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.frame.push(Value::Bool(a == b));
            }
            I::NotEqual => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.frame.push(Value::Bool(a != b));
            }
            I::Greater => self.compare(|o| o == std::cmp::Ordering::Greater)?,
            I::GreaterEqual => self.compare(|o| o != std::cmp::Ordering::Less)?,
            I::Less => self.compare(|o| o == std::cmp::Ordering::Less)?,
            I::LessEqual => self.compare(|o| o != std::cmp::Ordering::Greater)?,

            I::Jump(pos) => self.frame.position = pos,
            I::JumpIfNil(pos) => {
                let v = self.pop()?;
                if v.is_nil() {
                    self.frame.position = pos;
                }
            }
            I::JumpIfTrue(pos) => {
                let v = self.pop()?;
                if v.is_truthy() {
                    self.frame.position = pos;
                }
            }
            I::JumpIfFalse(pos) => {
                let v = self.pop()?;
                if !v.is_truthy() {
                    self.frame.position = pos;
                }
            }
            I::JumpIfEmpty(pos) => {
                let v = self.pop()?;
                if is_empty(&v) {
                    self.frame.position = pos;
                }
            }
            I::JumpIfNotEmpty(pos) => {
                let v = self.pop()?;
                if !is_empty(&v) {
                    self.frame.position = pos;
                }
            }
            I::JumpIfSize(size, pos) => {
                if self.frame.stack.len() as u32 == size {
                    self.frame.position = pos;
                }
            }

            I::Call(n) => self.call(n, false)?,
            I::Apply(n) => self.call(n, true)?,
            I::Return => {
                let value = self.pop()?;
                match self.frame.parent.take() {
                    Some(parent) => {
                        self.frame = *parent;
                        self.frame.push(value);
                    }
                    None => return Ok(Some(Step::Exited)),
                }
            }
            I::Restore => {
                if self.frame.treat_restore_as_return {
                    let value = self.pop()?;
                    match self.frame.parent.take() {
                        Some(parent) => {
                            self.frame = *parent;
                            self.frame.push(value);
                        }
                        None => return Ok(Some(Step::Exited)),
                    }
                } else {
                    match self.frame.parent.take() {
                        Some(parent) => self.frame = *parent,
                        None => return Ok(Some(Step::Exited)),
                    }
                }
            }
            I::Throw => {
                let value = self.pop()?;
                loop {
                    if let Some(target) = self.frame.catch_targets.pop() {
                        self.frame.position = target;
                        self.frame.push(value);
                        break;
                    }
                    match self.frame.parent.take() {
                        Some(parent) => self.frame = *parent,
                        None => return Err(VmError::Uncaught(value)),
                    }
                }
            }
            I::SetupCatch(target) => self.frame.catch_targets.push(target),
            I::EndCatch => {
                self.frame.catch_targets.pop();
            }

            I::Spawn => {
                let callee = self.pop()?;
                let pid = match callee {
                    Value::Function(fd) => self.host.spawn(fd.code.clone(), Arc::clone(&fd.scope)),
                    other => {
                        return Err(CoreError::TypeError {
                            expected: "function",
                            found: other.type_name(),
                        }
                        .into())
                    }
                };
                self.frame.push(Value::Integer(pid.into()));
            }
            I::Exit => return Ok(Some(Step::Exited)),
            I::Send => {
                let message = self.pop()?;
                let pid_value = self.pop()?;
                let pid = as_pid(&pid_value)?;
                self.host.send(pid, message);
                self.frame.push(Value::Undefined);
            }
            I::Receive => match self.host.receive() {
                Some(v) => self.frame.push(v),
                None => {
                    self.frame.position = start;
                    return Ok(Some(Step::WaitingForMessage));
                }
            },
            I::Block => return Ok(Some(Step::Blocked)),
            I::Yield => return Ok(Some(Step::Yielded)),

            I::Head => {
                let v = self.pop()?;
                match v {
                    Value::Pair(h, _) => self.frame.push((*h).clone()),
                    other => {
                        return Err(CoreError::TypeError {
                            expected: "pair",
                            found: other.type_name(),
                        }
                        .into())
                    }
                }
            }
            I::Tail => {
                let v = self.pop()?;
                match v {
                    Value::Pair(_, t) => self.frame.push((*t).clone()),
                    other => {
                        return Err(CoreError::TypeError {
                            expected: "pair",
                            found: other.type_name(),
                        }
                        .into())
                    }
                }
            }
            I::Reverse => {
                let v = self.pop()?;
                let mut items: Vec<Value> = v.iter_pairs().cloned().collect();
                items.reverse();
                self.frame.push(Value::from_sequence(items));
            }
            I::Unpack => {
                let v = self.pop()?;
                for item in v.iter_pairs().cloned() {
                    self.frame.push(item);
                }
            }

            I::BuildPair => {
                let tail = self.pop()?;
                let head = self.pop()?;
                self.frame.push(Value::Pair(Arc::new(head), Arc::new(tail)));
            }
            I::BuildList => {
                let count_value = self.pop()?;
                let count = as_u32(&count_value)?;
                let items = self.pop_n_forward(count)?;
                self.frame.push(Value::from_sequence(items));
            }
            I::BuildQuoted => {
                let v = self.pop()?;
                self.frame.push(Value::Quoted(Arc::new(v)));
            }
            I::BuildQuasiquoted => {
                let v = self.pop()?;
                self.frame.push(Value::Quasiquoted(Arc::new(v)));
            }
            I::BuildUnquoted => {
                let v = self.pop()?;
                self.frame.push(Value::Unquoted(Arc::new(v)));
            }
            I::BuildFunction => {
                let code_value = self.pop()?;
                let code = match code_value {
                    Value::Code(c) => c,
                    other => {
                        return Err(CoreError::TypeError {
                            expected: "code",
                            found: other.type_name(),
                        }
                        .into())
                    }
                };
                self.frame.push(Value::Function(Arc::new(FunctionData {
                    code,
                    scope: Arc::clone(&self.frame.scope),
                    name: None,
                })));
            }
            I::BuildMacro(k) => self.build_macro(k)?,
            I::BuildRule => self.build_rule()?,
            I::BuildPattern => {
                let v = self.pop()?;
                self.frame.push(Value::Pattern(Arc::new(v)));
            }
            I::BuildTemplate(n) => {
                let templates = self.pop_n_forward(n)?;
                self.frame.push(Value::Template(Arc::new(Value::from_sequence(templates))));
            }
            I::BuildContinuation => return Err(VmError::UnhandledInstruction("BuildContinuation")),
            I::BuildModule => self.build_module()?,

            I::Eval => {
                let expr = self.pop()?;
                self.eval(expr)?;
            }
        }
        Ok(None)
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.frame.pop().ok_or_else(|| VmError::Core(CoreError::StackUnderflow))
    }

    fn pop_n_forward(&mut self, n: u32) -> Result<Vec<Value>, VmError> {
        let mut values = Vec::with_capacity(n as usize);
        for _ in 0..n {
            values.push(self.pop()?);
        }
        values.reverse();
        Ok(values)
    }

    fn constant_symbol(&self, i: u32) -> Result<Symbol, VmError> {
        match self.frame.code.module.constant(i).map_err(CoreError::from)? {
            Value::Symbol(s) => Ok(s.clone()),
            other => Err(CoreError::TypeError {
                expected: "symbol",
                found: other.type_name(),
            }
            .into()),
        }
    }

    fn binop(&mut self, f: impl Fn(&Value, &Value) -> Result<Value, CoreError>) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.frame.push(f(&a, &b)?);
        Ok(())
    }

    fn compare(&mut self, test: impl Fn(std::cmp::Ordering) -> bool) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let ordering = mania_core::arithmetic::compare(&a, &b)?;
        self.frame.push(Value::Bool(test(ordering)));
        Ok(())
    }

    fn duplicate(&mut self, n: u32) -> Result<(), VmError> {
        let len = self.frame.stack.len();
        if (n as usize) > len {
            return Err(CoreError::StackUnderflow.into());
        }
        let group: Vec<Value> = self.frame.stack[len - n as usize..].to_vec();
        self.frame.stack.extend(group);
        Ok(())
    }

    fn rotate(&mut self, n: u32) -> Result<(), VmError> {
        let len = self.frame.stack.len();
        if (n as usize) >= len {
            return Err(CoreError::StackUnderflow.into());
        }
        let idx = len - 1 - n as usize;
        let v = self.frame.stack.remove(idx);
        self.frame.push(v);
        Ok(())
    }

    /// Pops `n` call arguments (LIFO) and reverses them back into the
    /// push order a caller produced them in (`arg1` deepest, `argn`
    /// topmost — see `mania-compiler`'s calling-convention doc comment).
    /// For `Apply`, the deepest of the `n` values is the list to splice;
    /// synthesizing that order is `synthesize_call`'s job, this just
    /// undoes it symmetrically.
    fn call(&mut self, n: u32, is_apply: bool) -> Result<(), VmError> {
        let mut popped = self.pop_n_forward(n)?;
        let args = if is_apply {
            if popped.is_empty() {
                return Err(CoreError::StackUnderflow.into());
            }
            let restlist = popped.remove(0);
            match restlist {
                Value::Nil => popped,
                Value::Pair(_, _) => {
                    popped.extend(restlist.iter_pairs().cloned());
                    popped
                }
                other => {
                    return Err(CoreError::TypeError {
                        expected: "list",
                        found: other.type_name(),
                    }
                    .into())
                }
            }
        } else {
            popped
        };

        let callee = self.pop()?;
        self.invoke(callee, args)
    }

    fn invoke(&mut self, callee: Value, mut args: Vec<Value>) -> Result<(), VmError> {
        match callee {
            Value::NativeFunction(nf) => {
                let result = (nf.callable)(&args)?;
                self.frame.push(result);
            }
            Value::Function(fd) => {
                let new_scope = Scope::child(Arc::clone(&fd.scope));
                let mut new_frame = Frame::new(fd.code.clone(), new_scope, None);
                for a in args.drain(..) {
                    new_frame.push(a);
                }
                self.push_frame(new_frame);
            }
            other => {
                return Err(CoreError::TypeError {
                    expected: "callable",
                    found: other.type_name(),
                }
                .into())
            }
        }
        Ok(())
    }

    /// Installs `new_frame` as current. Applies §4.3's tail-call/restore
    /// merging: the previously-current frame becomes `new_frame`'s parent
    /// unless the two frames' boundary instructions qualify for splicing,
    /// in which case the previous frame is skipped entirely (its own
    /// parent is used instead).
    fn push_frame(&mut self, mut new_frame: Frame) {
        std::mem::swap(&mut self.frame, &mut new_frame);
        // `new_frame` now holds what was previously current; `self.frame`
        // is the newly-installed one.
        let (splice, rewrite) = splice_decision(&new_frame, &self.frame.code);
        if rewrite {
            self.frame.treat_restore_as_return = true;
        }
        self.frame.parent = if splice {
            new_frame.parent.take()
        } else {
            Some(Box::new(new_frame))
        };
    }

    fn build_rule(&mut self) -> Result<(), VmError> {
        let templates_value = self.pop()?;
        let templates = match templates_value {
            Value::Template(t) => (*t).clone(),
            other => {
                return Err(CoreError::TypeError {
                    expected: "template",
                    found: other.type_name(),
                }
                .into())
            }
        };
        let pattern_value = self.pop()?;
        let pattern = match pattern_value {
            Value::Pattern(p) => (*p).clone(),
            other => {
                return Err(CoreError::TypeError {
                    expected: "pattern",
                    found: other.type_name(),
                }
                .into())
            }
        };
        // Intermediate "compiled rule" marker: a plain Pair, since `Rule`
        // has no Value variant of its own.
        self.frame.push(Value::Pair(Arc::new(pattern), Arc::new(templates)));
        Ok(())
    }

    fn build_macro(&mut self, k: u32) -> Result<(), VmError> {
        let rule_pairs = self.pop_n_forward(k)?;
        let mut rules = Vec::with_capacity(rule_pairs.len());
        for rp in rule_pairs {
            match rp {
                Value::Pair(pattern, templates) => {
                    rules.push(mania_core::Rule {
                        pattern: (*pattern).clone(),
                        templates: templates.iter_pairs().cloned().collect(),
                    });
                }
                other => {
                    return Err(CoreError::TypeError {
                        expected: "compiled rule",
                        found: other.type_name(),
                    }
                    .into())
                }
            }
        }
        self.frame.push(Value::Macro(Arc::new(rules)));
        Ok(())
    }

    fn build_module(&mut self) -> Result<(), VmError> {
        let name_value = self.pop()?;
        // The module's own name is `constants[0]` already; popped here
        // only to keep the compiler/VM stack protocol symmetric with
        // `compile_module_body`'s emission order.
        match name_value {
            Value::Symbol(_) => {}
            other => {
                return Err(CoreError::TypeError {
                    expected: "symbol",
                    found: other.type_name(),
                }
                .into())
            }
        };
        let exports_value = self.pop()?;
        let export_syms: Vec<Symbol> = exports_value
            .iter_pairs()
            .map(|v| match v {
                Value::Symbol(s) => Ok(s.clone()),
                other => Err(CoreError::TypeError {
                    expected: "symbol",
                    found: other.type_name(),
                }),
            })
            .collect::<Result<_, _>>()?;

        let exports_scope = Scope::root();
        for sym in &export_syms {
            let value = self
                .frame
                .scope
                .lookup_local(sym)
                .ok_or_else(|| VmError::Name(sym.clone()))?;
            exports_scope.define(sym.clone(), value);
        }

        *self.frame.code.module.scope.lock().unwrap() = Some(exports_scope);
        self.host.register_module(Arc::clone(&self.frame.code.module));
        self.frame.push(Value::Module(Arc::clone(&self.frame.code.module)));
        Ok(())
    }

    /// §4.3's `Eval` dispatch, implementing all six cases verbatim.
    fn eval(&mut self, expr: Value) -> Result<(), VmError> {
        match expr {
            Value::Pair(head, tail) => match head.as_ref() {
                Value::Pair(_, _) => self.synthesize_call(&head, &tail)?,
                Value::Symbol(sym) => {
                    let resolved = self
                        .frame
                        .scope
                        .lookup(sym)
                        .or_else(|| colon_path::resolve(&self.frame.scope, sym));
                    match resolved {
                        Some(Value::Macro(rules)) => self.expand_user_macro(&rules, &Value::Pair(Arc::clone(&head), Arc::clone(&tail)))?,
                        Some(Value::NativeMacro(rules)) => {
                            self.expand_native_macro(&rules, &Value::Pair(Arc::clone(&head), Arc::clone(&tail)))?
                        }
                        Some(Value::Function(_)) => self.synthesize_call(&head, &tail)?,
                        Some(other) => {
                            return Err(CoreError::TypeError {
                                expected: "function or macro",
                                found: other.type_name(),
                            }
                            .into())
                        }
                        None => return Err(VmError::Name(sym.clone())),
                    }
                }
                other => {
                    return Err(CoreError::TypeError {
                        expected: "pair or symbol head",
                        found: other.type_name(),
                    }
                    .into())
                }
            },
            Value::Symbol(sym) => {
                let resolved = self
                    .frame
                    .scope
                    .lookup(&sym)
                    .or_else(|| colon_path::resolve(&self.frame.scope, &sym));
                match resolved {
                    Some(Value::Macro(rules)) => match mania_pattern::expand_macro(&rules, &Value::Symbol(sym.clone())) {
                        Ok(expansions) => self.push_compiled_expansions(expansions)?,
                        Err(_) => self.frame.push(Value::Macro(rules)),
                    },
                    Some(other) => self.frame.push(other),
                    None => return Err(VmError::Name(sym)),
                }
            }
            Value::Quoted(inner) => self.frame.push((*inner).clone()),
            Value::Quasiquoted(inner) => self.frame.push(Value::Quasiquoted(inner)),
            Value::Unquoted(_) => {
                return Err(CoreError::TypeError {
                    expected: "value inside quasiquote",
                    found: "unquoted",
                }
                .into())
            }
            other => self.frame.push(other),
        }
        Ok(())
    }

    /// Synthesizes and pushes a call snippet for `(head . tail)`:
    /// compiles `head` then each argument with `Eval` after it, capped
    /// with a bare `Call(n)`/`Apply(n)` — no trailing `Return`/`Restore`,
    /// per §4.3. `Apply`'s spliced list is pushed immediately after the
    /// callee (deepest among the n argument slots) so it is naturally
    /// the last of the n values `Apply` pops.
    fn synthesize_call(&mut self, head: &Value, tail: &Value) -> Result<(), VmError> {
        let mut elems: Vec<Value> = tail.iter_pairs().cloned().collect();
        let is_apply = matches!(elems.last(), Some(Value::Ellipsis));
        if is_apply {
            elems.pop();
        }

        let mut compiler = SimpleCompiler::new(Symbol::new("eval-call"));
        compiler.compile_any(head).map_err(VmError::from)?;
        compiler.builder.emit(Instruction::Eval);

        if is_apply {
            let rest = elems.pop().ok_or(VmError::Core(CoreError::StackUnderflow))?;
            compiler.compile_any(&rest).map_err(VmError::from)?;
            compiler.builder.emit(Instruction::Eval);
            for e in &elems {
                compiler.compile_any(e).map_err(VmError::from)?;
                compiler.builder.emit(Instruction::Eval);
            }
            compiler.builder.emit(Instruction::Apply(elems.len() as u32 + 1));
        } else {
            for e in &elems {
                compiler.compile_any(e).map_err(VmError::from)?;
                compiler.builder.emit(Instruction::Eval);
            }
            compiler.builder.emit(Instruction::Call(elems.len() as u32));
        }

        let module = compiler.builder.finish(0);
        self.push_chained_frames(vec![Code::whole_module(module)])
    }

    fn expand_user_macro(&mut self, rules: &[mania_core::Rule], expr: &Value) -> Result<(), VmError> {
        let expansions = mania_pattern::expand_macro(rules, expr)?;
        self.push_compiled_expansions(expansions)
    }

    fn expand_native_macro(&mut self, rules: &[mania_core::NativeRule], expr: &Value) -> Result<(), VmError> {
        for rule in rules {
            let mut bindings: Bindings = Bindings::new();
            if mania_pattern::pattern::match_pattern(&rule.pattern, expr, &mut bindings).is_ok() {
                let compile_fn = |v: &Value| -> Result<mania_core::Builder, CoreError> {
                    let mut c = SimpleCompiler::new(Symbol::new("native-macro"));
                    c.compile_any(v).map_err(CoreError::from)?;
                    Ok(c.builder)
                };
                let codes = (rule.callable)(&bindings, &compile_fn)?;
                return self.push_chained_frames(codes);
            }
        }
        Err(VmError::Pattern(mania_pattern::PatternError::NoMatch))
    }

    /// Compiles each expansion Value (`compile_any` + `Eval` + `Return`)
    /// into its own `Code` fragment, then chains them as frames.
    fn push_compiled_expansions(&mut self, expansions: Vec<Value>) -> Result<(), VmError> {
        let mut codes = Vec::with_capacity(expansions.len());
        for v in &expansions {
            let mut compiler = SimpleCompiler::new(Symbol::new("macro-expansion"));
            compiler.compile_any(v).map_err(VmError::from)?;
            compiler.builder.emit(Instruction::Eval);
            compiler.builder.emit(Instruction::Return);
            codes.push(Code::whole_module(compiler.builder.finish(0)));
        }
        self.push_chained_frames(codes)
    }

    /// Pushes one frame per `Code`, in reverse order, chained as nested
    /// parents, so the first Code in `codes` runs first and eventually
    /// restores through the others back to the frame that had `Eval`.
    fn push_chained_frames(&mut self, codes: Vec<Code>) -> Result<(), VmError> {
        if codes.is_empty() {
            return Ok(());
        }
        let scope = Arc::clone(&self.frame.scope);
        let placeholder = Frame::new(codes[0].clone(), Arc::clone(&scope), None);
        let mut original = Some(std::mem::replace(&mut self.frame, placeholder));

        let mut next_parent: Option<Box<Frame>> = None;
        for code in codes.into_iter().rev() {
            let mut frame = Frame::new(code, Arc::clone(&scope), None);
            frame.parent = if let Some(orig) = original.take() {
                // Only the boundary against the pre-Eval frame (the last
                // Code in the original list, first one built here) is
                // eligible for tail-call/restore fusion; the links between
                // chained expansion fragments are plain continuations.
                let (splice, rewrite) = splice_decision(&orig, &frame.code);
                if rewrite {
                    frame.treat_restore_as_return = true;
                }
                if splice {
                    let mut orig = orig;
                    orig.parent.take()
                } else {
                    Some(Box::new(orig))
                }
            } else {
                next_parent.take()
            };
            next_parent = Some(Box::new(frame));
        }
        self.frame = *next_parent.take().unwrap();
        Ok(())
    }

    /// The generic terminal condition: when the current frame's position
    /// has run off the end of its code window without an explicit
    /// `Return`/`Restore` having already switched frames, restore to the
    /// parent. Unlike a bare `Restore`, this transfers a pending value
    /// if the frame's stack holds one — the mechanism that threads a
    /// result up through an `Eval`-synthesized call snippet (which ends
    /// bare in `Call`/`Apply` with no trailing `Return`) once the
    /// callee's own `Return` has landed its value on the snippet's
    /// stack and the snippet frame itself falls off its own end.
    fn terminal_check(&mut self) -> Option<Step> {
        if !self.frame.at_end() {
            return None;
        }
        let pending = self.frame.pop();
        match self.frame.parent.take() {
            Some(parent) => {
                self.frame = *parent;
                if let Some(v) = pending {
                    self.frame.push(v);
                }
                None
            }
            None => Some(Step::Exited),
        }
    }
}

/// §4.3's tail-call/restore merging: given the frame about to become a
/// parent (`old`, still sitting at the position it will resume at) and
/// the code window of the frame being installed on top of it, decides
/// whether to splice `old` out of the chain entirely (using its own
/// parent instead) and/or rewrite the new frame's `Restore`s to behave
/// as `Return`. Mirrors the four rules verbatim rather than approximating
/// them, since each combination has a distinct splice/rewrite outcome.
fn splice_decision(old: &Frame, new_code: &Code) -> (bool, bool) {
    let previous_next = old.peek_next_instruction();
    let new_last = last_instruction_of(new_code);
    match (previous_next, new_last) {
        (Some(Instruction::Return), Some(Instruction::Return)) => (true, false),
        (Some(Instruction::Return), Some(Instruction::Restore)) => (true, true),
        (Some(Instruction::Restore), Some(Instruction::Restore)) => (true, false),
        // `peek_next_instruction` is `None` exactly when `old` has already
        // run off its own window — rule 4's "previous position already
        // exits its code window".
        (None, Some(Instruction::Restore)) => (true, false),
        _ => (false, false),
    }
}

/// The last instruction in a code window, decoded forward from its entry
/// point (instructions are variable-length, so there is no cheaper way
/// to find the final one without storing it separately at compile time).
fn last_instruction_of(code: &Code) -> Option<Instruction> {
    let mut pos = code.entry_point;
    let limit = code.end();
    let mut last = None;
    while pos < limit {
        match Instruction::decode(&code.module.instructions, pos) {
            Ok((instr, next)) => {
                last = Some(instr);
                pos = next;
            }
            Err(_) => break,
        }
    }
    last
}

fn is_empty(v: &Value) -> bool {
    match v {
        Value::Nil => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn as_pid(v: &Value) -> Result<u64, VmError> {
    match v {
        Value::Integer(i) => i.to_u64().ok_or(VmError::Core(CoreError::TypeError {
            expected: "pid-sized integer",
            found: "integer",
        })),
        other => Err(CoreError::TypeError {
            expected: "integer",
            found: other.type_name(),
        }
        .into()),
    }
}

fn as_u32(v: &Value) -> Result<u32, VmError> {
    match v {
        Value::Integer(i) => i.to_u32().ok_or(VmError::Core(CoreError::TypeError {
            expected: "small integer",
            found: "integer",
        })),
        other => Err(CoreError::TypeError {
            expected: "integer",
            found: other.type_name(),
        }
        .into()),
    }
}
