use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::bindings::Bindings;
use crate::error::CoreError;
use crate::module::{Builder, Code};
use crate::scope::Scope;
use crate::symbol::Symbol;

/// A host-side compilation callback threaded through to `NativeRule`
/// callables so a builtin macro (`define`, `let`, `if`, ...) can compile a
/// user-supplied sub-expression without `mania-core` depending on
/// `mania-compiler`. `mania-compiler` supplies the actual implementation
/// (`SimpleCompiler::compile_any` wrapped in a closure) when it registers
/// its NativeMacros.
pub type CompileFn<'a> = dyn Fn(&Value) -> Result<Builder, CoreError> + 'a;

/// The closed tagged union of every Mania value (§3).
#[derive(Clone)]
pub enum Value {
    Ellipsis,
    Undefined,
    Nil,
    Bool(bool),
    Integer(BigInt),
    Float(f64),
    Symbol(Symbol),
    String(Arc<str>),
    Pair(Arc<Value>, Arc<Value>),
    Quoted(Arc<Value>),
    Quasiquoted(Arc<Value>),
    Unquoted(Arc<Value>),
    Function(Arc<FunctionData>),
    NativeFunction(Arc<NativeFunctionData>),
    Macro(Arc<Vec<Rule>>),
    NativeMacro(Arc<Vec<NativeRule>>),
    /// Wraps an S-expression that is interpreted as a structural matcher
    /// rather than data; the wrapped value mirrors source syntax exactly
    /// (a bare Symbol, a Pair chain, a Quoted literal, ...).
    Pattern(Arc<Value>),
    /// Wraps an S-expression interpreted as a template skeleton.
    Template(Arc<Value>),
    Code(Code),
    Module(Arc<crate::module::ModuleData>),
    Stream(StreamHandle),
    /// A placeholder binding awaiting definition — used to forward-declare
    /// names (optionally carrying a docstring).
    Annotation(Option<Arc<str>>),
}

/// A closure: a Code window plus the lexical scope it was built under.
pub struct FunctionData {
    pub code: Code,
    pub scope: Arc<Scope>,
    pub name: Option<Symbol>,
}

/// A host-provided callable invoked by `Call`/`Apply`.
pub struct NativeFunctionData {
    pub name: Option<Symbol>,
    pub callable: Box<dyn Fn(&[Value]) -> Result<Value, CoreError> + Send + Sync>,
}

/// One (pattern, templates) rule of a user-defined macro.
pub struct Rule {
    pub pattern: Value,
    pub templates: Vec<Value>,
}

/// One rule of a NativeMacro: a pattern plus a host callable that builds
/// Code fragments directly, bypassing template expansion (§4.2).
pub struct NativeRule {
    pub pattern: Value,
    pub callable:
        Arc<dyn Fn(&Bindings, &CompileFn) -> Result<Vec<Code>, CoreError> + Send + Sync>,
}

/// An opaque I/O handle (§3). The core crate only carries the handle tag;
/// actual byte-level read/write lives in `mania-runtime`'s `mania:io`
/// native module, which is the only place with stdio access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamHandle {
    Stdin,
    Stdout,
    Stderr,
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn symbol(s: impl AsRef<str>) -> Value {
        Value::Symbol(Symbol::new(s))
    }

    pub fn int(i: i64) -> Value {
        Value::Integer(BigInt::from(i))
    }

    /// Builds a proper list (Nil-terminated Pair chain) from a sequence,
    /// right to left.
    pub fn from_sequence(items: Vec<Value>) -> Value {
        let mut acc = Value::Nil;
        for item in items.into_iter().rev() {
            acc = Value::Pair(Arc::new(item), Arc::new(acc));
        }
        acc
    }

    /// Iterates a proper or improper Pair chain. Stops (without yielding
    /// the tail) at the first non-Pair value; callers that care whether
    /// the chain was proper should check `PairIter::tail()` afterward.
    pub fn iter_pairs(&self) -> PairIter<'_> {
        PairIter { cursor: Some(self) }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(_, _))
    }

    /// Truthiness per §4.1: Undefined, Nil, false, numeric zero, and the
    /// empty string are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => !i.eq(&BigInt::from(0)),
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// The type-name string `Type` pushes, also used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Ellipsis => "ellipsis",
            Value::Undefined => "undefined",
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Symbol(_) => "symbol",
            Value::String(_) => "string",
            Value::Pair(_, _) => "pair",
            Value::Quoted(_) => "quoted",
            Value::Quasiquoted(_) => "quasiquoted",
            Value::Unquoted(_) => "unquoted",
            Value::Function(_) => "function",
            Value::NativeFunction(_) => "native-function",
            Value::Macro(_) => "macro",
            Value::NativeMacro(_) => "native-macro",
            Value::Pattern(_) => "pattern",
            Value::Template(_) => "template",
            Value::Code(_) => "code",
            Value::Module(_) => "module",
            Value::Stream(_) => "stream",
            Value::Annotation(_) => "annotation",
        }
    }
}

pub struct PairIter<'a> {
    cursor: Option<&'a Value>,
}

impl<'a> Iterator for PairIter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match self.cursor {
            Some(Value::Pair(head, tail)) => {
                self.cursor = Some(tail);
                Some(head)
            }
            _ => None,
        }
    }
}

impl<'a> PairIter<'a> {
    /// What's left after iteration stopped: `Nil` for a proper list, the
    /// dotted tail otherwise.
    pub fn tail(&self) -> &'a Value {
        self.cursor.unwrap_or(&Value::Nil)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Ellipsis, Ellipsis) | (Undefined, Undefined) | (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => {
                crate::arithmetic::bigint_to_f64(a) == *b
            }
            (Symbol(a), Symbol(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Pair(ah, at), Pair(bh, bt)) => ah == bh && at == bt,
            (Quoted(a), Quoted(b)) => a == b,
            (Quasiquoted(a), Quasiquoted(b)) => a == b,
            (Unquoted(a), Unquoted(b)) => a == b,
            (Pattern(a), Pattern(b)) => a == b,
            (Template(a), Template(b)) => a == b,
            (Function(a), Function(b)) => Arc::ptr_eq(a, b),
            (NativeFunction(a), NativeFunction(b)) => Arc::ptr_eq(a, b),
            (Macro(a), Macro(b)) => Arc::ptr_eq(a, b),
            (NativeMacro(a), NativeMacro(b)) => Arc::ptr_eq(a, b),
            (Code(a), Code(b)) => a == b,
            (Module(a), Module(b)) => Arc::ptr_eq(a, b) || a.structurally_eq(b),
            (Stream(a), Stream(b)) => a == b,
            (Annotation(a), Annotation(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ellipsis => write!(f, "..."),
            Value::Undefined => write!(f, "#undefined"),
            Value::Nil => write!(f, "()"),
            Value::Bool(true) => write!(f, "#t"),
            Value::Bool(false) => write!(f, "#f"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Pair(_, _) => write_pair(self, f),
            Value::Quoted(v) => write!(f, "'{v}"),
            Value::Quasiquoted(v) => write!(f, "`{v}"),
            Value::Unquoted(v) => write!(f, ",{v}"),
            Value::Function(fd) => match &fd.name {
                Some(n) => write!(f, "#<function {n}>"),
                None => write!(f, "#<function>"),
            },
            Value::NativeFunction(nf) => match &nf.name {
                Some(n) => write!(f, "#<native-function {n}>"),
                None => write!(f, "#<native-function>"),
            },
            Value::Macro(_) => write!(f, "#<macro>"),
            Value::NativeMacro(_) => write!(f, "#<native-macro>"),
            Value::Pattern(p) => write!(f, "#<pattern {p}>"),
            Value::Template(t) => write!(f, "#<template {t}>"),
            Value::Code(c) => write!(f, "#<code {}..{}>", c.entry_point, c.entry_point + c.size),
            Value::Module(m) => write!(f, "#<module {}>", m.name),
            Value::Stream(s) => write!(f, "#<stream {s:?}>"),
            Value::Annotation(doc) => match doc {
                Some(d) => write!(f, "#<annotation {d:?}>"),
                None => write!(f, "#<annotation>"),
            },
        }
    }
}

fn write_pair(mut v: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    let mut first = true;
    loop {
        match v {
            Value::Pair(head, tail) => {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write!(f, "{head}")?;
                v = tail;
            }
            Value::Nil => break,
            other => {
                write!(f, " . {other}")?;
                break;
            }
        }
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec() {
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::int(1).is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::Bool(true).is_truthy());
    }

    #[test]
    fn pair_chain_round_trips_through_sequence() {
        let items = vec![Value::int(1), Value::int(2), Value::int(3)];
        let list = Value::from_sequence(items.clone());
        let collected: Vec<Value> = list.iter_pairs().cloned().collect();
        assert_eq!(collected, items);
    }

    #[test]
    fn printing_distinguishes_proper_and_dotted_pairs() {
        let proper = Value::from_sequence(vec![Value::int(1), Value::int(2)]);
        assert_eq!(format!("{proper}"), "(1 2)");

        let dotted = Value::Pair(Arc::new(Value::int(1)), Arc::new(Value::int(2)));
        assert_eq!(format!("{dotted}"), "(1 . 2)");
    }

    #[test]
    fn quote_sigils_print_correctly() {
        assert_eq!(format!("{}", Value::Quoted(Arc::new(Value::int(1)))), "'1");
        assert_eq!(format!("{}", Value::Quasiquoted(Arc::new(Value::int(1)))), "`1");
        assert_eq!(format!("{}", Value::Unquoted(Arc::new(Value::int(1)))), ",1");
    }

    #[test]
    fn equality_widens_integer_float_comparison() {
        assert_eq!(Value::int(2), Value::Float(2.0));
        assert_eq!(Value::Float(2.0), Value::int(2));
    }
}
