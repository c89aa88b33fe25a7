//! Shared compilation logic for `define-module` (§4.4, §4.7, §6.1).
//!
//! `define-module`'s *registration* side effect (inserting the finished
//! Module into a Node's `loaded_modules`) needs runtime state this crate
//! doesn't have, so the actual NativeMacro is assembled in
//! `mania-runtime`'s boot module. This crate only owns the pure part:
//! compiling a module's body plus its exports list into a `ModuleData`,
//! mirroring `mania/builtins.py`'s `register_module` and
//! `mania/builtins/mania_boot.py`'s `define_module`, which share this
//! exact logic in the Python original.

use std::sync::Arc;

use mania_core::{Instruction, ModuleData, Symbol, Value};

use crate::compiler::SimpleCompiler;
use crate::error::CompileError;

/// The dispatch pattern every `define-module` NativeRule should match:
/// `(_ name (export ...) body ...)`. Built by hand rather than via
/// `dispatch_pattern` since the exports slot nests a sub-list.
pub fn pattern() -> Value {
    let mut items = vec![Value::symbol("_"), Value::symbol("name")];
    items.push(Value::from_sequence(vec![Value::symbol("export"), Value::Ellipsis]));
    items.push(Value::symbol("body"));
    items.push(Value::Ellipsis);
    Value::from_sequence(items)
}

/// Compiles `body` (each form compiled then `Eval`'d, in the defining
/// scope) followed by `BuildModule` over `exports`/`name`, capped with
/// `Exit` rather than `Return` — per spec.md, `define-module` terminates
/// its process rather than returning to a caller.
pub fn compile_module_body(name: Symbol, exports: &[Symbol], body: &[Value]) -> Result<Arc<ModuleData>, CompileError> {
    let mut compiler = SimpleCompiler::new(name.clone());
    for form in body {
        compiler.compile_any(form)?;
        compiler.builder.emit(Instruction::Eval);
    }

    let exports_value = Value::from_sequence(exports.iter().cloned().map(Value::Symbol).collect());
    let exports_idx = compiler.builder.constant(exports_value);
    compiler.builder.emit(Instruction::LoadConstant(exports_idx));

    let name_idx = compiler.builder.constant(Value::Symbol(name));
    compiler.builder.emit(Instruction::LoadConstant(name_idx));

    compiler.builder.emit(Instruction::BuildModule);
    compiler.builder.emit(Instruction::Exit);

    Ok(compiler.builder.finish(0))
}
