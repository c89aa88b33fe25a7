//! `if` and `and` (§4.4, §6.2). Grounded on `mania/builtins.py`'s `if_`
//! and `and_`.

use std::sync::Arc;

use mania_core::{Bindings, Code, CompileFn, CoreError, Instruction, NativeRule, Symbol, Value};

use crate::compiler::SimpleCompiler;
use crate::macros::{dispatch_pattern, many, one};

fn if_with_else_rule() -> NativeRule {
    let pattern = dispatch_pattern(&["cond", "then", "else"], None);
    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let cond = one(bindings, "cond")?.clone();
            let then = one(bindings, "then")?.clone();
            let otherwise = one(bindings, "else")?.clone();
            build_if(&cond, &then, Some(&otherwise))
        }),
    }
}

fn if_without_else_rule() -> NativeRule {
    let pattern = dispatch_pattern(&["cond", "then"], None);
    NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let cond = one(bindings, "cond")?.clone();
            let then = one(bindings, "then")?.clone();
            build_if(&cond, &then, None)
        }),
    }
}

fn build_if(cond: &Value, then: &Value, otherwise: Option<&Value>) -> Result<Vec<Code>, CoreError> {
    let mut compiler = SimpleCompiler::new(Symbol::new("if"));
    compiler.compile_any(cond)?;
    compiler.builder.emit(Instruction::Eval);
    let false_at = compiler.builder.emit(Instruction::JumpIfFalse(0));
    compiler.compile_any(then)?;
    compiler.builder.emit(Instruction::Eval);
    let end_at = compiler.builder.emit(Instruction::Jump(0));
    let else_pos = compiler.builder.position();
    compiler.builder.patch_operand(false_at, else_pos);
    match otherwise {
        Some(e) => {
            compiler.compile_any(e)?;
            compiler.builder.emit(Instruction::Eval);
        }
        None => {
            let undef = compiler.builder.constant(Value::Undefined);
            compiler.builder.emit(Instruction::LoadConstant(undef));
        }
    }
    let end_pos = compiler.builder.position();
    compiler.builder.patch_operand(end_at, end_pos);
    compiler.builder.emit(Instruction::Return);

    let module = compiler.builder.finish(0);
    Ok(vec![Code::whole_module(module)])
}

/// `if`'s rules, else-bearing form tried first.
pub fn if_rules() -> Vec<NativeRule> {
    vec![if_with_else_rule(), if_without_else_rule()]
}

pub fn if_name() -> Symbol {
    Symbol::new("if")
}

/// `and`: short-circuits to the first falsy argument, else the last
/// argument's value (`#t` with zero arguments).
pub fn and_rules() -> Vec<NativeRule> {
    let pattern = dispatch_pattern(&[], Some("args"));
    vec![NativeRule {
        pattern,
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let args = many(bindings, "args")?;
            let mut compiler = SimpleCompiler::new(Symbol::new("and"));

            if args.is_empty() {
                let t = compiler.builder.constant(Value::Bool(true));
                compiler.builder.emit(Instruction::LoadConstant(t));
            } else {
                compiler.compile_any(&args[0])?;
                compiler.builder.emit(Instruction::Eval);
                let mut end_jumps = Vec::new();
                for arg in &args[1..] {
                    compiler.builder.emit(Instruction::Duplicate(1));
                    end_jumps.push(compiler.builder.emit(Instruction::JumpIfFalse(0)));
                    compiler.builder.emit(Instruction::Pop(1));
                    compiler.compile_any(arg)?;
                    compiler.builder.emit(Instruction::Eval);
                }
                let end_pos = compiler.builder.position();
                for at in end_jumps {
                    compiler.builder.patch_operand(at, end_pos);
                }
            }
            compiler.builder.emit(Instruction::Return);

            let module = compiler.builder.finish(0);
            Ok(vec![Code::whole_module(module)])
        }),
    }]
}

pub fn and_name() -> Symbol {
    Symbol::new("and")
}
