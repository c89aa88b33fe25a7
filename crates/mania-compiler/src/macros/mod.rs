//! The special forms bound in the default scope (§4.4, §6.2): `define`,
//! `lambda`, `let`, `if`, `and`, `define-syntax`, `import`. Each is a
//! `NativeMacro` whose rule callable builds a small bytecode fragment
//! with its own private `SimpleCompiler`, mirroring `mania/builtins.py`.
//!
//! Calling convention used by every parameter-binding prologue here
//! (documented once, not per-macro): a caller pushes its `n` argument
//! values left-to-right (`arg1` ends up deepest, `argn` on top); `Call`
//! seeds the callee's fresh stack with that same relative order. A fixed
//! parameter list of arity k is therefore bound by emitting `Store` in
//! *reverse* declared order (the first `Store` pops `argk`, matching the
//! last parameter). A trailing variadic parameter is bound first, before
//! the fixed ones: push `Nil`, then loop consing the stack's remaining
//! values onto it with `BuildPair` until exactly `k` fixed arguments are
//! left (checked by `JumpIfSize(k + 1, ...)`, `+1` for the accumulator
//! itself) — no `Reverse` is needed because each cons naturally prepends
//! the most-recently-pushed (i.e. rightmost-remaining) argument, which
//! is exactly the order a left-to-right variadic list wants.

pub mod begin;
pub mod define;
pub mod define_syntax;
pub mod if_and;
pub mod import;
pub mod lambda;
pub mod let_;
pub mod module_build;

use mania_core::{Builder, Instruction, Symbol, Value};

use crate::compiler::is_malformed_identifier;
use crate::error::CompileError;

/// Compiles the parameter-binding prologue for a function/lambda body at
/// the builder's current position. `variadic`, if present, is the name
/// bound to the Nil-terminated list of every argument past `fixed`.
pub fn compile_param_prologue(
    builder: &mut Builder,
    fixed: &[Symbol],
    variadic: Option<&Symbol>,
) -> Result<(), CompileError> {
    for p in fixed {
        if is_malformed_identifier(p) {
            return Err(CompileError::MalformedIdentifier(p.clone()));
        }
    }
    if let Some(v) = variadic {
        if is_malformed_identifier(v) {
            return Err(CompileError::MalformedIdentifier(v.clone()));
        }

        let nil_idx = builder.constant(Value::Nil);
        builder.emit(Instruction::LoadConstant(nil_idx));

        let loop_pos = builder.position();
        let check_at = builder.emit(Instruction::JumpIfSize(fixed.len() as u32 + 1, 0));
        builder.emit(Instruction::BuildPair);
        builder.emit(Instruction::Jump(loop_pos));
        let end_pos = builder.position();
        // JumpIfSize's first operand is the size threshold (already
        // correct); only the jump destination (second operand) is patched.
        builder.patch_second_operand(check_at, end_pos);

        let rest_idx = builder.constant(Value::Symbol(v.clone()));
        builder.emit(Instruction::Store(rest_idx));
    }

    for p in fixed.iter().rev() {
        let idx = builder.constant(Value::Symbol(p.clone()));
        builder.emit(Instruction::Store(idx));
    }
    Ok(())
}

/// Splits a parameter list `(p1 p2 ... pn ...)` into fixed names plus an
/// optional trailing variadic name. Rejects an `Ellipsis` anywhere but
/// immediately after the last name.
pub fn split_parameters(params: &[Value]) -> Result<(Vec<Symbol>, Option<Symbol>), CompileError> {
    let mut fixed = Vec::new();
    let mut variadic = None;
    let mut i = 0;
    while i < params.len() {
        let name = match &params[i] {
            Value::Symbol(s) => s.clone(),
            _ => return Err(CompileError::MisplacedVariadic),
        };
        let next_is_ellipsis = matches!(params.get(i + 1), Some(Value::Ellipsis));
        if next_is_ellipsis {
            if i + 2 != params.len() {
                return Err(CompileError::MisplacedVariadic);
            }
            variadic = Some(name);
            break;
        }
        fixed.push(name);
        i += 1;
    }
    Ok((fixed, variadic))
}

/// Collects a `Value` Pair-chain (or `Nil`) of parameters/body forms into
/// a `Vec`, the shape every binding under an ellipsis pattern takes.
pub fn sequence_to_vec(v: &Value) -> Vec<Value> {
    v.iter_pairs().cloned().collect()
}

use mania_core::Binding;

/// Fetches a single (non-ellipsis) pattern variable's value.
pub fn one<'a>(bindings: &'a mania_core::Bindings, name: &str) -> Result<&'a Value, CompileError> {
    match bindings.get(&Symbol::new(name)) {
        Some(Binding::One(v)) => Ok(v),
        _ => Err(CompileError::BadLetBinding),
    }
}

/// Fetches an ellipsis-bound pattern variable's repeated values.
pub fn many<'a>(bindings: &'a mania_core::Bindings, name: &str) -> Result<&'a [Value], CompileError> {
    match bindings.get(&Symbol::new(name)) {
        Some(Binding::Many(v)) => Ok(v),
        _ => Err(CompileError::BadLetBinding),
    }
}

/// Extracts a plain `Symbol` from a pattern-bound `Value`.
pub fn as_symbol(v: &Value) -> Result<Symbol, CompileError> {
    match v {
        Value::Symbol(s) => Ok(s.clone()),
        _ => Err(CompileError::MisplacedVariadic),
    }
}

/// Compiles a closure body — parameter prologue, each body form compiled
/// and `Eval`'d in turn, capped with `Return` — at the compiler's current
/// position. Returns `(body_start, body_end)`; callers then emit
/// `LoadCode(body_start, body_end - body_start)` + `BuildFunction` as the
/// glue that turns that code window into a runtime closure value.
pub fn compile_closure_body(
    compiler: &mut crate::compiler::SimpleCompiler,
    fixed: &[Symbol],
    variadic: Option<&Symbol>,
    body: &[Value],
) -> Result<(u32, u32), CompileError> {
    let body_start = compiler.builder.position();
    compile_param_prologue(&mut compiler.builder, fixed, variadic)?;
    for form in body {
        compiler.compile_any(form)?;
        compiler.builder.emit(Instruction::Eval);
    }
    if body.is_empty() {
        let undef = compiler.builder.constant(Value::Undefined);
        compiler.builder.emit(Instruction::LoadConstant(undef));
    }
    compiler.builder.emit(Instruction::Return);
    let body_end = compiler.builder.position();
    Ok((body_start, body_end))
}

/// Emits the `LoadCode` + `BuildFunction` pair that turns a just-compiled
/// body window into a closure value on top of the stack.
pub fn emit_build_function(compiler: &mut crate::compiler::SimpleCompiler, body_start: u32, body_end: u32) {
    compiler
        .builder
        .emit(Instruction::LoadCode(body_start, body_end - body_start));
    compiler.builder.emit(Instruction::BuildFunction);
}

/// Builds a `NativeMacro` pattern matching `(_ slot1 slot2 ... ["..."])`,
/// where every `slot` name also becomes the bound variable for that
/// position, and a trailing `ellipsis_var`, if given, binds the rest.
pub fn dispatch_pattern(slots: &[&str], ellipsis_var: Option<&str>) -> Value {
    let mut items: Vec<Value> = vec![Value::symbol("_")];
    items.extend(slots.iter().map(|s| Value::symbol(s)));
    if let Some(v) = ellipsis_var {
        items.push(Value::symbol(v));
        items.push(Value::Ellipsis);
    }
    Value::from_sequence(items)
}
