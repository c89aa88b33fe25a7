//! `lambda` (§4.4, §6.2): builds an anonymous Function value. Grounded on
//! `mania/builtins.py`'s `lambda_`.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::SimpleCompiler;
use crate::macros::{compile_closure_body, emit_build_function, many, split_parameters};

pub fn rules() -> Vec<NativeRule> {
    let pattern = Value::from_sequence(vec![
        Value::symbol("_"),
        Value::from_sequence(vec![Value::symbol("params"), Value::Ellipsis]),
        Value::symbol("body"),
        Value::Ellipsis,
    ]);

    vec![NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let params = many(bindings, "params")?;
            let body = many(bindings, "body")?;
            let (fixed, variadic) = split_parameters(params)?;

            let mut compiler = SimpleCompiler::new(Symbol::new("lambda"));
            let (body_start, body_end) = compile_closure_body(&mut compiler, &fixed, variadic.as_ref(), body)?;
            emit_build_function(&mut compiler, body_start, body_end);
            compiler.builder.emit(Instruction::Return);

            let module = compiler.builder.finish(body_end);
            Ok(vec![Code::whole_module(module)])
        }),
    }]
}

pub fn name() -> Symbol {
    Symbol::new("lambda")
}
