//! `mania:boot` (§4 of SPEC_FULL.md): `define-module` and the no-op
//! documentation macros every module header is free to use.
//!
//! Grounded on `mania/builtins/mania_boot.py`'s `Boot` module, with one
//! deliberate simplification recorded in DESIGN.md: the Python original
//! splits `define-module` into a *deferred* registration phase (this
//! module) and a *synchronous* compilation phase (`mania/builtins.py`,
//! re-run once `Node.load_module` re-spawns the registered form under a
//! different scope). Here `define-module` compiles and runs its body
//! immediately, in one NativeMacro, reusing
//! `mania_compiler::macros::module_build`'s pure compilation helper —
//! the two-phase indirection existed to let one Node discover a module's
//! name before running its body, which this workspace's `Node::init_modules`
//! already does up front for every `.bam` file (see `node.rs`).

use std::sync::Arc;

use mania_compiler::macros::{as_symbol, many, module_build, one};
use mania_core::{Bindings, Code, CompileFn, CoreError, NativeRule, Symbol, Value};

fn define_module_rule() -> NativeRule {
    NativeRule {
        pattern: module_build::pattern(),
        callable: Arc::new(|bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> {
            let name = as_symbol(one(bindings, "name")?)?;
            let exports = many(bindings, "export")?
                .iter()
                .map(as_symbol)
                .collect::<Result<Vec<_>, _>>()?;
            let body = many(bindings, "body")?;

            let module = module_build::compile_module_body(name, &exports, body).map_err(CoreError::from)?;
            Ok(vec![Code::whole_module(module)])
        }),
    }
}

pub fn define_module_name() -> Symbol {
    Symbol::new("define-module")
}

/// `(comment ...)`, `(author ...)`, and the other header-documentation
/// forms: match anything, compile to nothing. Grounded on
/// `mania_boot.py`'s `ignore` NativeMacro factory.
fn ignore_rule() -> NativeRule {
    NativeRule {
        pattern: Value::from_sequence(vec![Value::symbol("_"), Value::symbol("body"), Value::Ellipsis]),
        callable: Arc::new(|_bindings: &Bindings, _compile: &CompileFn| -> Result<Vec<Code>, CoreError> { Ok(Vec::new()) }),
    }
}

const IGNORED_HEADER_FORMS: &[&str] = &["comment", "author", "copyright", "license", "version", "description"];

/// Every `(Symbol, Value::NativeMacro)` binding `mania:boot` contributes.
pub fn bindings() -> Vec<(Symbol, Value)> {
    let mut out = vec![(
        define_module_name(),
        Value::NativeMacro(Arc::new(vec![define_module_rule()])),
    )];
    for name in IGNORED_HEADER_FORMS {
        out.push((Symbol::new(*name), Value::NativeMacro(Arc::new(vec![ignore_rule()]))));
    }
    out
}
