//! `begin`: evaluates each form in order, in the current scope, for the
//! value of the last one. Not named among §6.2's reserved head forms,
//! but required to make sense of §8's own named-let scenario (`(begin
//! (println n) (loop (- n 1)))` inside an `if`'s single-form branch) —
//! `if`'s `then`/`else` slots each hold exactly one form
//! (`macros::if_and::build_if`), so sequencing two side-effecting forms
//! inside one branch needs this. The same "compile each form, `Eval`,
//! no intervening `Pop`" idiom already appears, inlined, in
//! `let_::plain_let_rule`'s and `module_build::compile_module_body`'s
//! body loops; this gives it its own reusable head form.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::SimpleCompiler;
use crate::macros::{dispatch_pattern, many};

fn rule() -> NativeRule {
    let pattern = dispatch_pattern(&[], Some("body"));
    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let body = many(bindings, "body")?;

            let mut compiler = SimpleCompiler::new(Symbol::new("begin"));
            for f in body {
                compiler.compile_any(f)?;
                compiler.builder.emit(Instruction::Eval);
            }
            if body.is_empty() {
                let undef = compiler.builder.constant(Value::Undefined);
                compiler.builder.emit(Instruction::LoadConstant(undef));
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
    Symbol::new("begin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mania_pattern::pattern::match_pattern;

    #[test]
    fn pattern_matches_zero_or_more_forms() {
        let mut bindings = Bindings::new();
        let form = Value::from_sequence(vec![Value::symbol("begin")]);
        assert!(match_pattern(&rule().pattern, &form, &mut bindings).is_ok());
    }
}
