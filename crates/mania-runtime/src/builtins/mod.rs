//! The native modules/functions a Node needs before it can run any of
//! §8's end-to-end scenarios (SPEC_FULL.md §4): `mania:boot`'s
//! `define-module` plus header no-ops, `mania:io`'s Streams and
//! read/write, and the default-scope arithmetic/comparison/list/`println`
//! natives.

pub mod boot;
pub mod io;
pub mod natives;

use std::sync::Arc;

use mania_core::{Scope, Symbol, Value};

/// Builds the root scope every Process's top-level frame is ultimately
/// parented at (§4.5's "global root scope for user modules is the
/// `default_scope` of the boot module"). Built once per Node.
pub fn default_scope() -> Arc<Scope> {
    let scope = Scope::root();

    for (name, value) in mania_compiler::default_scope_macros() {
        scope.define(name, value);
    }
    for (name, value) in boot::bindings() {
        scope.define(name, value);
    }
    for (name, value) in natives::bindings() {
        scope.define(name, value);
    }
    scope.define(Symbol::new("mania:io"), Value::Module(io::module()));

    scope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scope_binds_every_reserved_head_form() {
        let scope = default_scope();
        for name in [
            "define-module",
            "begin",
            "define",
            "define-syntax",
            "lambda",
            "let",
            "if",
            "and",
            "import",
            "+",
            "-",
            "*",
            "==",
            "/=",
            ">",
            "println",
            "format",
            "head",
            "tail",
        ] {
            assert!(scope.lookup(&Symbol::new(name)).is_some(), "missing {name}");
        }
    }

    #[test]
    fn mania_io_is_bound_as_a_module_with_its_streams_exported() {
        let scope = default_scope();
        match scope.lookup(&Symbol::new("mania:io")) {
            Some(Value::Module(m)) => {
                let exports = m.scope.lock().unwrap().clone().unwrap();
                assert!(exports.lookup_local(&Symbol::new("stdout")).is_some());
            }
            other => panic!("expected mania:io module, got {other:?}"),
        }
    }
}
