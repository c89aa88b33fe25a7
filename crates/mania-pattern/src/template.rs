use std::sync::Arc;

use mania_core::{Binding, Bindings, Symbol, Value};

use crate::error::PatternError;

/// Expands a macro-rule template against `bindings`. A template that
/// isn't `Quasiquoted` is data, reproduced verbatim (§4.2); a
/// `Quasiquoted` template enters substitution mode.
pub fn expand(template: &Value, bindings: &Bindings) -> Result<Value, PatternError> {
    match template {
        Value::Quasiquoted(inner) => expand_substitution(inner, bindings, None),
        other => Ok(other.clone()),
    }
}

fn expand_substitution(node: &Value, bindings: &Bindings, index: Option<usize>) -> Result<Value, PatternError> {
    match node {
        Value::Unquoted(inner) => expand_unquoted(inner, bindings, index),
        Value::Pair(t_head, t_tail) => {
            if let Value::Pair(ellipsis, t_rest) = t_tail.as_ref() {
                if matches!(ellipsis.as_ref(), Value::Ellipsis) {
                    return expand_ellipsis(t_head, t_rest, bindings);
                }
            }
            let head = expand_substitution(t_head, bindings, index)?;
            let tail = expand_substitution(t_tail, bindings, index)?;
            Ok(Value::Pair(Arc::new(head), Arc::new(tail)))
        }
        Value::Quoted(inner) => Ok(Value::Quoted(Arc::new(expand_substitution(inner, bindings, index)?))),
        Value::Quasiquoted(inner) => {
            Ok(Value::Quasiquoted(Arc::new(expand_substitution(inner, bindings, index)?)))
        }
        other => Ok(other.clone()),
    }
}

fn expand_unquoted(inner: &Value, bindings: &Bindings, index: Option<usize>) -> Result<Value, PatternError> {
    match inner {
        Value::Symbol(sym) => lookup_for_index(sym, bindings, index),
        // Non-symbol unquoted expressions (e.g. `,(foo bar)`) are beyond
        // what the ellipsis/template algorithm in §4.2 specifies; we
        // reproduce the inner form's own substitution recursively rather
        // than evaluating it, since evaluation is `Eval`'s job, not the
        // template engine's.
        other => expand_substitution(other, bindings, index),
    }
}

fn lookup_for_index(sym: &Symbol, bindings: &Bindings, index: Option<usize>) -> Result<Value, PatternError> {
    match bindings.get(sym) {
        None => Err(PatternError::UnboundTemplateVar(sym.clone())),
        Some(Binding::One(v)) => Ok(v.clone()),
        Some(Binding::Many(list)) => match index {
            Some(i) => list
                .get(i)
                .cloned()
                .ok_or_else(|| PatternError::UnboundTemplateVar(sym.clone())),
            None => Ok(Value::from_sequence(list.clone())),
        },
    }
}

/// Expands `t_head` repeatedly (§4.2): the repeat count is the shortest
/// length among every ellipsis-bound variable `t_head` references (an
/// empty set of such variables repeats zero times). This realizes the
/// "terminated by an out-of-bounds index" rule as an up-front bound
/// rather than an exception caught mid-loop, which keeps the control
/// flow a plain `Result`.
fn expand_ellipsis(t_head: &Value, t_rest: &Value, bindings: &Bindings) -> Result<Value, PatternError> {
    let mut vars = Vec::new();
    collect_unquoted_vars(t_head, &mut vars);

    let mut repeat_count = None;
    for v in &vars {
        if let Some(Binding::Many(list)) = bindings.get(v) {
            repeat_count = Some(match repeat_count {
                Some(n) => n.min(list.len()),
                None => list.len(),
            });
        }
    }
    let repeat_count = repeat_count.unwrap_or(0);

    let mut items = Vec::with_capacity(repeat_count);
    for i in 0..repeat_count {
        items.push(expand_substitution(t_head, bindings, Some(i))?);
    }

    let rest = expand_substitution(t_rest, bindings, None)?;
    let mut acc = rest;
    for item in items.into_iter().rev() {
        acc = Value::Pair(Arc::new(item), Arc::new(acc));
    }
    Ok(acc)
}

fn collect_unquoted_vars(node: &Value, out: &mut Vec<Symbol>) {
    match node {
        Value::Unquoted(inner) => match inner.as_ref() {
            Value::Symbol(s) => out.push(s.clone()),
            other => collect_unquoted_vars(other, out),
        },
        Value::Pair(head, tail) => {
            collect_unquoted_vars(head, out);
            collect_unquoted_vars(tail, out);
        }
        Value::Quoted(inner) | Value::Quasiquoted(inner) => collect_unquoted_vars(inner, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    fn list(items: Vec<Value>) -> Value {
        Value::from_sequence(items)
    }

    #[test]
    fn plain_value_template_reproduces_verbatim() {
        let template = Value::int(42);
        let bindings = Bindings::new();
        assert_eq!(expand(&template, &bindings).unwrap(), Value::int(42));
    }

    #[test]
    fn ellipsis_template_expands_bound_list() {
        let mut bindings = Bindings::new();
        bindings.insert(
            Symbol::new("x"),
            Binding::Many(vec![Value::int(1), Value::int(2), Value::int(3)]),
        );
        let template = Value::Quasiquoted(Arc::new(Value::Pair(
            Arc::new(sym("list")),
            Arc::new(Value::Pair(
                Arc::new(Value::Unquoted(Arc::new(sym("x")))),
                Arc::new(Value::Pair(Arc::new(Value::Ellipsis), Arc::new(Value::Nil))),
            )),
        )));
        let expanded = expand(&template, &bindings).unwrap();
        let expected = list(vec![sym("list"), Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(expanded, expected);
    }

    #[test]
    fn unquote_substitutes_single_binding() {
        let mut bindings = Bindings::new();
        bindings.insert(Symbol::new("x"), Binding::One(Value::int(7)));
        let template = Value::Quasiquoted(Arc::new(Value::Unquoted(Arc::new(sym("x")))));
        assert_eq!(expand(&template, &bindings).unwrap(), Value::int(7));
    }
}
