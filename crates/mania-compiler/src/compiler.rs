use mania_core::{Builder, Instruction, Symbol, Value};

use crate::error::CompileError;

/// Lowers S-expressions to bytecode. Grounded in `mania/compiler.py`'s
/// `SimpleCompiler`: the compiler never resolves a symbol or calls a
/// function itself — it only builds, on the stack, a runtime
/// representation of the source text. The `Eval` instruction (executed
/// later, by the VM) is what actually interprets that representation:
/// looking up symbols, expanding macros, and calling functions. This is
/// why `compile_constant` treats every non-structural leaf (including
/// plain symbols) as an opaque constant to push, not a variable load.
pub struct SimpleCompiler {
    pub builder: Builder,
}

impl SimpleCompiler {
    pub fn new(name: Symbol) -> SimpleCompiler {
        SimpleCompiler {
            builder: Builder::new(name),
        }
    }

    /// Compiles a whole top-level program: one `Eval` per top-level form,
    /// capped with `Exit`.
    pub fn compile_program(&mut self, forms: &[Value]) -> Result<(), CompileError> {
        for form in forms {
            self.compile_any(form)?;
            self.builder.emit(Instruction::Eval);
        }
        self.builder.emit(Instruction::Exit);
        Ok(())
    }

    pub fn compile_any(&mut self, value: &Value) -> Result<(), CompileError> {
        match value {
            Value::Pair(head, tail) => self.compile_pair(head, tail),
            Value::Quoted(inner) => self.compile_quoted(inner),
            Value::Quasiquoted(inner) => self.compile_quasiquoted(inner),
            Value::Unquoted(inner) => self.compile_unquoted(inner),
            other => self.compile_constant(other),
        }
    }

    fn compile_pair(&mut self, head: &Value, tail: &Value) -> Result<(), CompileError> {
        self.compile_any(head)?;
        self.compile_any(tail)?;
        self.builder.emit(Instruction::BuildPair);
        Ok(())
    }

    fn compile_quoted(&mut self, inner: &Value) -> Result<(), CompileError> {
        self.compile_any(inner)?;
        self.builder.emit(Instruction::BuildQuoted);
        Ok(())
    }

    fn compile_quasiquoted(&mut self, inner: &Value) -> Result<(), CompileError> {
        self.compile_any(inner)?;
        self.builder.emit(Instruction::BuildQuasiquoted);
        Ok(())
    }

    fn compile_unquoted(&mut self, inner: &Value) -> Result<(), CompileError> {
        self.compile_any(inner)?;
        self.builder.emit(Instruction::BuildUnquoted);
        Ok(())
    }

    fn compile_constant(&mut self, value: &Value) -> Result<(), CompileError> {
        let index = self.builder.constant(value.clone());
        self.builder.emit(Instruction::LoadConstant(index));
        Ok(())
    }
}

/// `true` when `sym` mixes `:` with other characters — malformed wherever
/// a definable name is expected (`define`/`lambda` parameters, `let`
/// bindings, module/macro names). A name made solely of colons (the
/// reserved field-access literal) is not malformed by this check.
pub fn is_malformed_identifier(sym: &Symbol) -> bool {
    sym.as_str().contains(':') && !sym.is_colon_literal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mania_core::Opcode;

    #[test]
    fn compiles_a_pair_into_build_pair_with_two_constants() {
        let mut compiler = SimpleCompiler::new(Symbol::new("m"));
        let expr = Value::Pair(
            std::sync::Arc::new(Value::int(1)),
            std::sync::Arc::new(Value::int(2)),
        );
        compiler.compile_any(&expr).unwrap();
        let decoded = mania_core::Instruction::decode(&compiler.builder.instructions, 0).unwrap();
        assert_eq!(decoded.0.opcode(), Opcode::LoadConstant);
        let last = compiler.builder.instructions.last().copied().unwrap();
        assert_eq!(last, Opcode::BuildPair as u8);
    }

    #[test]
    fn compile_program_emits_eval_per_form_then_exit() {
        let mut compiler = SimpleCompiler::new(Symbol::new("m"));
        compiler.compile_program(&[Value::int(1), Value::int(2)]).unwrap();
        let decoded = compiler.builder.instructions.clone();
        let instrs = mania_core::instruction::decode_all(&decoded).unwrap();
        assert_eq!(
            instrs,
            vec![
                Instruction::LoadConstant(1),
                Instruction::Eval,
                Instruction::LoadConstant(2),
                Instruction::Eval,
                Instruction::Exit,
            ]
        );
    }

    #[test]
    fn identifies_malformed_colon_identifiers() {
        assert!(is_malformed_identifier(&Symbol::new("a:b")));
        assert!(!is_malformed_identifier(&Symbol::new("::")));
        assert!(!is_malformed_identifier(&Symbol::new("plain")));
    }
}
