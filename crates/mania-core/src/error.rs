use std::fmt;

use crate::Symbol;

/// Errors raised while constructing, comparing, or (de)serializing values.
/// Hand-rolled rather than derived via `thiserror`, matching
/// `seq-compiler`'s `codegen::error::CodeGenError`.
#[derive(Debug)]
pub enum CoreError {
    /// A value's runtime tag did not match what an operation required
    /// (e.g. arithmetic on a Symbol).
    TypeError { expected: &'static str, found: &'static str },
    /// Attempted to operate on an empty operand stack.
    StackUnderflow,
    /// Malformed bytes encountered while decoding a bam module or an
    /// instruction stream.
    Decode(String),
    /// `Load` failed direct lookup and the colon-path descent also failed.
    NameError(Symbol),
    /// Integer parsing failure while decoding a constant.
    InvalidInteger(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::TypeError { expected, found } => {
                write!(f, "type error: expected {expected}, found {found}")
            }
            CoreError::StackUnderflow => write!(f, "stack underflow"),
            CoreError::Decode(msg) => write!(f, "decode error: {msg}"),
            CoreError::NameError(sym) => write!(f, "name error: unbound symbol `{sym}`"),
            CoreError::InvalidInteger(s) => write!(f, "invalid integer literal: {s}"),
        }
    }
}

impl std::error::Error for CoreError {}
