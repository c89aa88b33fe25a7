//! Default-scope arithmetic/comparison/list NativeFunctions (§6.2),
//! grounded in `mania/builtins.py`'s final `default_scope` table. These
//! are NativeFunctions rather than macros: the Python original's earlier
//! arithmetic *macro* forms (`Eval` + `Add`/`Sub`/`Mul`) were superseded,
//! in the same file, by simpler `NativeFunction` wrappers around
//! `Value.add`/`sub`/`mul` — we follow the superseding, later version.

use std::sync::Arc;

use mania_core::{arithmetic, CoreError, NativeFunctionData, Symbol, Value};

use crate::builtins::io;

fn native_fn(name: &str, f: impl Fn(&[Value]) -> Result<Value, CoreError> + Send + Sync + 'static) -> Value {
    Value::NativeFunction(Arc::new(NativeFunctionData {
        name: Some(Symbol::new(name)),
        callable: Box::new(f),
    }))
}

fn binary<'a>(args: &'a [Value], name: &'static str) -> Result<(&'a Value, &'a Value), CoreError> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(CoreError::TypeError {
            expected: name,
            found: "wrong arity",
        }),
    }
}

fn pair_of(v: &Value) -> Result<(Value, Value), CoreError> {
    match v {
        Value::Pair(head, tail) => Ok((head.as_ref().clone(), tail.as_ref().clone())),
        other => Err(CoreError::TypeError {
            expected: "pair",
            found: other.type_name(),
        }),
    }
}

/// `format`'s template language: `{}` is replaced, in order, by each
/// extra argument's `Display` rendering. A deliberately small subset of
/// Python `str.format`'s grammar (no positional/named `{0}`/`{name}`
/// placeholders) — the original's own usage is exclusively anonymous
/// `{}` slots.
fn format_string(template: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek() == Some(&'}') {
            chars.next();
            if let Some(arg) = args.next() {
                out.push_str(&arg.to_string());
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// The `(Symbol, Value)` bindings every default scope carries for §6.2's
/// arithmetic, comparison, I/O, and list-access reserved forms.
pub fn bindings() -> Vec<(Symbol, Value)> {
    vec![
        (
            Symbol::new("+"),
            native_fn("+", |args| {
                let (a, b) = binary(args, "+")?;
                arithmetic::add(a, b)
            }),
        ),
        (
            Symbol::new("-"),
            native_fn("-", |args| {
                let (a, b) = binary(args, "-")?;
                arithmetic::sub(a, b)
            }),
        ),
        (
            Symbol::new("*"),
            native_fn("*", |args| {
                let (a, b) = binary(args, "*")?;
                arithmetic::mul(a, b)
            }),
        ),
        (
            Symbol::new("=="),
            native_fn("==", |args| {
                let (a, b) = binary(args, "==")?;
                Ok(Value::Bool(a == b))
            }),
        ),
        (
            Symbol::new("/="),
            native_fn("/=", |args| {
                let (a, b) = binary(args, "/=")?;
                Ok(Value::Bool(a != b))
            }),
        ),
        (
            Symbol::new(">"),
            native_fn(">", |args| {
                let (a, b) = binary(args, ">")?;
                Ok(Value::Bool(arithmetic::compare(a, b)? == std::cmp::Ordering::Greater))
            }),
        ),
        (
            Symbol::new("head"),
            native_fn("head", |args| {
                let v = args.first().ok_or(CoreError::StackUnderflow)?;
                Ok(pair_of(v)?.0)
            }),
        ),
        (
            Symbol::new("tail"),
            native_fn("tail", |args| {
                let v = args.first().ok_or(CoreError::StackUnderflow)?;
                Ok(pair_of(v)?.1)
            }),
        ),
        (
            Symbol::new("format"),
            native_fn("format", |args| {
                let template = match args.first() {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => {
                        return Err(CoreError::TypeError {
                            expected: "string",
                            found: other.type_name(),
                        })
                    }
                    None => return Err(CoreError::StackUnderflow),
                };
                Ok(Value::string(format_string(&template, &args[1..])))
            }),
        ),
        (
            Symbol::new("println"),
            native_fn("println", |args| {
                let rendered = args.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
                io::write_to_stream(mania_core::StreamHandle::Stdout, &format!("{rendered}\n"))
                    .map_err(|e| CoreError::Decode(e.to_string()))?;
                Ok(Value::Undefined)
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(name: &str, entries: &'a [(Symbol, Value)]) -> &'a Value {
        &entries.iter().find(|(s, _)| s.as_str() == name).unwrap().1
    }

    fn call(v: &Value, args: &[Value]) -> Value {
        match v {
            Value::NativeFunction(f) => (f.callable)(args).unwrap(),
            _ => panic!("not a native function"),
        }
    }

    #[test]
    fn arithmetic_natives_delegate_to_core_arithmetic() {
        let entries = bindings();
        assert_eq!(call(find("+", &entries), &[Value::int(2), Value::int(3)]), Value::int(5));
        assert_eq!(call(find("-", &entries), &[Value::int(5), Value::int(2)]), Value::int(3));
        assert_eq!(call(find("*", &entries), &[Value::int(4), Value::int(3)]), Value::int(12));
    }

    #[test]
    fn comparison_natives_widen_like_value_equality() {
        let entries = bindings();
        assert_eq!(call(find("==", &entries), &[Value::int(2), Value::Float(2.0)]), Value::Bool(true));
        assert_eq!(call(find("/=", &entries), &[Value::int(2), Value::int(3)]), Value::Bool(true));
        assert_eq!(call(find(">", &entries), &[Value::int(5), Value::int(2)]), Value::Bool(true));
    }

    #[test]
    fn head_and_tail_destructure_a_pair() {
        let entries = bindings();
        let list = Value::from_sequence(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(call(find("head", &entries), &[list.clone()]), Value::int(1));
        let tail = call(find("tail", &entries), &[list]);
        assert_eq!(tail, Value::from_sequence(vec![Value::int(2), Value::int(3)]));
    }

    #[test]
    fn format_substitutes_anonymous_placeholders_in_order() {
        assert_eq!(format_string("{} + {} = {}", &[Value::int(1), Value::int(2), Value::int(3)]), "1 + 2 = 3");
    }
}
