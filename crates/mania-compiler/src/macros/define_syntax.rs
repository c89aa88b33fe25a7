//! `define-syntax` (§4.2, §4.4, §6.2): builds a `Macro` value from one or
//! more `(pattern template…)` rules and binds it. Grounded on
//! `mania/builtins.py`'s `define_syntax` and spec.md's description of
//! `BuildPattern`/`BuildTemplate`/`BuildRule`/`BuildMacro`.
//!
//! Each rule's pattern and templates are compiled as inert *data* (never
//! `Eval`'d — a pattern/template is matched/expanded structurally, not
//! executed), then assembled at runtime: `BuildPattern` wraps the
//! compiled pattern data, `BuildTemplate(n)` collects `n` compiled
//! template values into one rule's template list, `BuildRule` pairs
//! pattern with templates, and `BuildMacro(k)` collects `k` such rules
//! into the final `Macro` value.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::{is_malformed_identifier, SimpleCompiler};
use crate::error::CompileError;
use crate::macros::{as_symbol, many, one};

fn rule() -> NativeRule {
    let pattern = Value::from_sequence(vec![Value::symbol("_"), Value::symbol("name"), Value::symbol("rule"), Value::Ellipsis]);

    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let name = as_symbol(one(bindings, "name")?)?;
            if is_malformed_identifier(&name) {
                return Err(CompileError::MalformedIdentifier(name).into());
            }
            let rule_forms = many(bindings, "rule")?;

            let mut compiler = SimpleCompiler::new(name.clone());
            for rule_form in rule_forms {
                let mut parts = rule_form.iter_pairs();
                let pattern_expr = parts.next().ok_or(CompileError::BadLetBinding)?.clone();
                let template_exprs: Vec<Value> = parts.cloned().collect();
                if template_exprs.is_empty() {
                    return Err(CompileError::BadLetBinding.into());
                }

                compiler.compile_any(&pattern_expr)?;
                compiler.builder.emit(Instruction::BuildPattern);
                for t in &template_exprs {
                    compiler.compile_any(t)?;
                }
                compiler.builder.emit(Instruction::BuildTemplate(template_exprs.len() as u32));
                compiler.builder.emit(Instruction::BuildRule);
            }
            compiler.builder.emit(Instruction::BuildMacro(rule_forms.len() as u32));

            let name_idx = compiler.builder.constant(Value::Symbol(name));
            compiler.builder.emit(Instruction::Duplicate(1));
            compiler.builder.emit(Instruction::Store(name_idx));
            compiler.builder.emit(Instruction::Return);

            let module = compiler.builder.finish(0);
            Ok(vec![Code::whole_module(module)])
        }),
    }
}

pub fn rules() -> Vec<NativeRule> {
    vec![rule()]
}

pub fn name() -> Symbol {
    Symbol::new("define-syntax")
}
