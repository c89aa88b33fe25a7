//! `import` (§4.4, §6.2): `(import name)` binds the whole module under
//! its own name; `(import name (field ...))` binds each named export
//! locally. Compiles to `LoadModule` and, for named imports, field-by-
//! field `LoadField`/`Store` per spec.md's description — deliberately
//! not the no-op stub `mania/builtins.py`'s own `import_` leaves behind.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::SimpleCompiler;
use crate::error::CompileError;
use crate::macros::{as_symbol, dispatch_pattern, many, one, sequence_to_vec};

fn rule() -> NativeRule {
    let pattern = dispatch_pattern(&["name"], Some("rest"));
    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let name = as_symbol(one(bindings, "name")?)?;
            let rest = many(bindings, "rest")?;
            if rest.len() > 1 {
                return Err(CompileError::BadLetBinding.into());
            }

            let mut compiler = SimpleCompiler::new(Symbol::new("import"));
            let mod_idx = compiler.builder.constant(Value::Symbol(name));
            compiler.builder.emit(Instruction::LoadModule(mod_idx));

            match rest.first() {
                None => {
                    compiler.builder.emit(Instruction::Duplicate(1));
                    compiler.builder.emit(Instruction::Store(mod_idx));
                }
                Some(fields_form) => {
                    for field in sequence_to_vec(fields_form) {
                        let field_sym = as_symbol(&field)?;
                        let field_idx = compiler.builder.constant(Value::Symbol(field_sym));
                        compiler.builder.emit(Instruction::Duplicate(1));
                        compiler.builder.emit(Instruction::LoadField(field_idx));
                        compiler.builder.emit(Instruction::Store(field_idx));
                    }
                }
            }
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
    Symbol::new("import")
}
