//! `let`, with an optional name for local recursion (§4.4, §6.2).
//! Grounded on `mania/builtins.py`'s `let_`. Plain `let` desugars to an
//! immediately-invoked `lambda`; named `let` desugars to an
//! immediately-invoked zero-argument function whose body first `define`s
//! the recursive function under its name (so the closure it captures,
//! being the same live `Scope`, already sees the name by the time the
//! body actually runs) and then calls it with the initial values.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::SimpleCompiler;
use crate::macros::{as_symbol, compile_param_prologue, emit_build_function, many, one};
use crate::error::CompileError;

fn bindings_pattern() -> Value {
    Value::from_sequence(vec![
        Value::from_sequence(vec![Value::symbol("v"), Value::symbol("e")]),
        Value::Ellipsis,
    ])
}

fn extract_bindings(bindings: &Bindings) -> Result<(Vec<Symbol>, Vec<Value>), CoreError> {
    let vs = many(bindings, "v")?;
    let es = many(bindings, "e")?;
    if vs.len() != es.len() {
        return Err(CompileError::BadLetBinding.into());
    }
    let vars = vs.iter().map(as_symbol).collect::<Result<Vec<_>, _>>()?;
    Ok((vars, es.to_vec()))
}

fn plain_let_rule() -> NativeRule {
    let pattern = Value::from_sequence(vec![
        Value::symbol("_"),
        bindings_pattern(),
        Value::symbol("body"),
        Value::Ellipsis,
    ]);
    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let (vars, exprs) = extract_bindings(bindings)?;
            let body = many(bindings, "body")?;

            let mut compiler = SimpleCompiler::new(Symbol::new("let"));
            let body_start = compiler.builder.position();
            compile_param_prologue(&mut compiler.builder, &vars, None)?;
            for f in body {
                compiler.compile_any(f)?;
                compiler.builder.emit(Instruction::Eval);
            }
            if body.is_empty() {
                let undef = compiler.builder.constant(Value::Undefined);
                compiler.builder.emit(Instruction::LoadConstant(undef));
            }
            compiler.builder.emit(Instruction::Return);
            let body_end = compiler.builder.position();

            emit_build_function(&mut compiler, body_start, body_end);
            for e in &exprs {
                compiler.compile_any(e)?;
                compiler.builder.emit(Instruction::Eval);
            }
            compiler.builder.emit(Instruction::Call(vars.len() as u32));
            compiler.builder.emit(Instruction::Return);

            let module = compiler.builder.finish(body_end);
            Ok(vec![Code::whole_module(module)])
        }),
    }
}

fn named_let_rule() -> NativeRule {
    let pattern = Value::from_sequence(vec![
        Value::symbol("_"),
        Value::symbol("name"),
        bindings_pattern(),
        Value::symbol("body"),
        Value::Ellipsis,
    ]);
    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let name = as_symbol(one(bindings, "name")?)?;
            let (vars, exprs) = extract_bindings(bindings)?;
            let body = many(bindings, "body")?;

            let mut compiler = SimpleCompiler::new(name.clone());

            let inner_body_start = compiler.builder.position();
            compile_param_prologue(&mut compiler.builder, &vars, None)?;
            for f in body {
                compiler.compile_any(f)?;
                compiler.builder.emit(Instruction::Eval);
            }
            if body.is_empty() {
                let undef = compiler.builder.constant(Value::Undefined);
                compiler.builder.emit(Instruction::LoadConstant(undef));
            }
            compiler.builder.emit(Instruction::Return);
            let inner_body_end = compiler.builder.position();

            let outer_exec_start = inner_body_end;
            emit_build_function(&mut compiler, inner_body_start, inner_body_end);
            let loop_idx = compiler.builder.constant(Value::Symbol(name));
            compiler.builder.emit(Instruction::Duplicate(1));
            compiler.builder.emit(Instruction::Store(loop_idx));
            compiler.builder.emit(Instruction::Pop(1));
            compiler.builder.emit(Instruction::Load(loop_idx));
            for e in &exprs {
                compiler.compile_any(e)?;
                compiler.builder.emit(Instruction::Eval);
            }
            compiler.builder.emit(Instruction::Call(vars.len() as u32));
            compiler.builder.emit(Instruction::Return);
            let outer_exec_end = compiler.builder.position();

            emit_build_function(&mut compiler, outer_exec_start, outer_exec_end);
            compiler.builder.emit(Instruction::Call(0));
            compiler.builder.emit(Instruction::Return);

            let module = compiler.builder.finish(outer_exec_end);
            Ok(vec![Code::whole_module(module)])
        }),
    }
}

/// `let`'s rules. Plain form is tried first: its pattern requires the
/// bindings slot to structurally be a `((v e) ...)` list, so it never
/// matches a named-let invocation (whose corresponding slot is a bare
/// name symbol). Named form is the permissive fallback — a bare pattern
/// variable matches anything, so it must not be tried first.
pub fn rules() -> Vec<NativeRule> {
    vec![plain_let_rule(), named_let_rule()]
}

pub fn name() -> Symbol {
    Symbol::new("let")
}
