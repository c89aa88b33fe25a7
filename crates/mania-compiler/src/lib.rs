//! Mania Compiler: lowers S-expressions to bytecode (`SimpleCompiler`) and
//! the default-scope special forms (`define`, `lambda`, `let`, `if`,
//! `and`, `define-syntax`, `import`) that only need compile-time state.
//!
//! `define-module` is intentionally absent: its `BuildModule` companion
//! needs a Node's module registry, so its NativeMacro is assembled in
//! `mania-runtime`'s boot module, reusing [`macros::module_build`]'s pure
//! compilation helper.

pub mod compiler;
pub mod error;
pub mod macros;

pub use compiler::{is_malformed_identifier, SimpleCompiler};
pub use error::CompileError;

use mania_core::Value;

/// The `(Symbol, Value::NativeMacro)` bindings every default scope should
/// carry, per §6.2's reserved head forms (minus `define-module`, minus
/// whatever `mania-runtime`'s `mania:io`/native-function builtins add).
pub fn default_scope_macros() -> Vec<(mania_core::Symbol, Value)> {
    vec![
        (macros::begin::name(), Value::NativeMacro(std::sync::Arc::new(macros::begin::rules()))),
        (macros::define::name(), Value::NativeMacro(std::sync::Arc::new(macros::define::rules()))),
        (macros::lambda::name(), Value::NativeMacro(std::sync::Arc::new(macros::lambda::rules()))),
        (macros::let_::name(), Value::NativeMacro(std::sync::Arc::new(macros::let_::rules()))),
        (macros::if_and::if_name(), Value::NativeMacro(std::sync::Arc::new(macros::if_and::if_rules()))),
        (macros::if_and::and_name(), Value::NativeMacro(std::sync::Arc::new(macros::if_and::and_rules()))),
        (
            macros::define_syntax::name(),
            Value::NativeMacro(std::sync::Arc::new(macros::define_syntax::rules())),
        ),
        (macros::import::name(), Value::NativeMacro(std::sync::Arc::new(macros::import::rules()))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scope_macros_covers_every_non_module_special_form() {
        let names: Vec<String> = default_scope_macros().into_iter().map(|(s, _)| s.as_str().to_string()).collect();
        for expected in ["begin", "define", "lambda", "let", "if", "and", "define-syntax", "import"] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }
}
