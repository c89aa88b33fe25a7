use std::fmt;

use mania_core::Symbol;

/// Recoverable within macro expansion: a Macro tries each rule in order
/// and only re-raises once every rule fails (§4.2, §7).
#[derive(Debug)]
pub enum PatternError {
    NoMatch,
    /// A template referenced `,sym` but `sym` has no binding at all.
    UnboundTemplateVar(Symbol),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::NoMatch => write!(f, "pattern did not match"),
            PatternError::UnboundTemplateVar(sym) => {
                write!(f, "template variable `{sym}` has no binding")
            }
        }
    }
}

impl std::error::Error for PatternError {}
