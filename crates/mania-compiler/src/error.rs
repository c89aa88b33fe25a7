use std::fmt;

use mania_core::{CoreError, Symbol};
use mania_pattern::PatternError;

/// Errors raised while lowering source into bytecode. Grounded in
/// `mania/builtins.py`'s `ExpandError`/`SyntaxError` raises and in the
/// "Expand error" kind of §7.
#[derive(Debug)]
pub enum CompileError {
    /// A colon-containing identifier is used somewhere colons aren't
    /// permitted (parameter names, `define` targets, module names).
    MalformedIdentifier(Symbol),
    /// `let` bindings and values lists don't have matching lengths.
    BadLetBinding,
    /// A variadic parameter (`x ...`) wasn't the final parameter.
    MisplacedVariadic,
    Pattern(PatternError),
    Core(CoreError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::MalformedIdentifier(s) => {
                write!(f, "`{s}` is not a valid identifier here")
            }
            CompileError::BadLetBinding => write!(f, "let binding needs exactly one value"),
            CompileError::MisplacedVariadic => {
                write!(f, "a variadic parameter must be the last parameter")
            }
            CompileError::Pattern(e) => write!(f, "{e}"),
            CompileError::Core(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<PatternError> for CompileError {
    fn from(e: PatternError) -> Self {
        CompileError::Pattern(e)
    }
}

impl From<CoreError> for CompileError {
    fn from(e: CoreError) -> Self {
        CompileError::Core(e)
    }
}

/// Lets a NativeRule callable (whose signature is fixed to return
/// `CoreError`, since it lives behind `mania-core`'s `NativeRule` type)
/// propagate a `CompileError` without a match arm at every call site.
impl From<CompileError> for CoreError {
    fn from(e: CompileError) -> Self {
        match e {
            CompileError::Core(inner) => inner,
            other => CoreError::Decode(other.to_string()),
        }
    }
}
