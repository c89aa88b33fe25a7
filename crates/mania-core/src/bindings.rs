use std::collections::HashMap;

use crate::symbol::Symbol;
use crate::value::Value;

/// What a pattern symbol is bound to: a single value, or — when the
/// symbol occurred under an ellipsis — the list of values matched across
/// each repetition.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    One(Value),
    Many(Vec<Value>),
}

/// The result of matching a Pattern against an expression.
pub type Bindings = HashMap<Symbol, Binding>;
