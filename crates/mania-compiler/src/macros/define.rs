//! `define` (§4.4, §6.2): binds a value, or a Function built from a
//! `lambda`-like body, into the current scope. Grounded on
//! `mania/builtins.py`'s `define_function`/`define_value`.
//!
//! Both forms share one pattern — `(_ target body ...)` — rather than
//! competing NativeRules, because a value-form's value is frequently
//! itself a Pair (`(define total (+ a b))`), which would also
//! structurally satisfy a function-form pattern's `(name params ...)`
//! slot (a bare pattern variable matches anything). The shape of
//! `target` is inspected in the callable instead: a Pair means function
//! form, a bare Symbol means value form.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::{is_malformed_identifier, SimpleCompiler};
use crate::error::CompileError;
use crate::macros::{as_symbol, compile_closure_body, emit_build_function, many, one, split_parameters};

fn rule() -> NativeRule {
    let pattern = Value::from_sequence(vec![Value::symbol("_"), Value::symbol("target"), Value::symbol("body"), Value::Ellipsis]);

    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let target = one(bindings, "target")?.clone();
            let body = many(bindings, "body")?;
            match &target {
                Value::Pair(head, tail) => {
                    let name = as_symbol(head)?;
                    if is_malformed_identifier(&name) {
                        return Err(CompileError::MalformedIdentifier(name).into());
                    }
                    let params: Vec<Value> = tail.iter_pairs().cloned().collect();
                    let (fixed, variadic) = split_parameters(&params)?;

                    let mut compiler = SimpleCompiler::new(name.clone());
                    let (body_start, body_end) = compile_closure_body(&mut compiler, &fixed, variadic.as_ref(), body)?;
                    emit_build_function(&mut compiler, body_start, body_end);

                    let name_idx = compiler.builder.constant(Value::Symbol(name));
                    compiler.builder.emit(Instruction::Duplicate(1));
                    compiler.builder.emit(Instruction::Store(name_idx));
                    compiler.builder.emit(Instruction::Return);

                    let module = compiler.builder.finish(body_end);
                    Ok(vec![Code::whole_module(module)])
                }
                Value::Symbol(name) => {
                    if is_malformed_identifier(name) {
                        return Err(CompileError::MalformedIdentifier(name.clone()).into());
                    }
                    if body.len() != 1 {
                        return Err(CompileError::BadLetBinding.into());
                    }
                    let mut compiler = SimpleCompiler::new(name.clone());
                    compiler.compile_any(&body[0])?;
                    compiler.builder.emit(Instruction::Eval);
                    let name_idx = compiler.builder.constant(Value::Symbol(name.clone()));
                    compiler.builder.emit(Instruction::Duplicate(1));
                    compiler.builder.emit(Instruction::Store(name_idx));
                    compiler.builder.emit(Instruction::Return);

                    let module = compiler.builder.finish(0);
                    Ok(vec![Code::whole_module(module)])
                }
                _ => Err(CompileError::MisplacedVariadic.into()),
            }
        }),
    }
}

/// The `define` NativeMacro's rules (just the one, shape-inspecting rule).
pub fn rules() -> Vec<NativeRule> {
    vec![rule()]
}

pub fn name() -> Symbol {
    Symbol::new("define")
}
