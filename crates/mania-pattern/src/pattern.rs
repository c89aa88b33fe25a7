use std::collections::HashMap;

use mania_core::{Binding, Bindings, Symbol, Value};

use crate::error::PatternError;

/// Matches `pattern` against `expr`, populating `bindings`. Grounded on
/// `mania/types.py`'s `Pattern.match_pattern`/`match_pair`/`match_symbol`/
/// `match_quoted`.
pub fn match_pattern(pattern: &Value, expr: &Value, bindings: &mut Bindings) -> Result<(), PatternError> {
    match pattern {
        Value::Symbol(s) if s.as_str() == "_" => Ok(()),
        Value::Symbol(s) => {
            bindings.insert(s.clone(), Binding::One(expr.clone()));
            Ok(())
        }
        Value::Quoted(v) => {
            if expr == v.as_ref() {
                Ok(())
            } else {
                Err(PatternError::NoMatch)
            }
        }
        Value::Pair(p_head, p_tail) => match_pair(p_head, p_tail, expr, bindings),
        other => {
            if other == expr {
                Ok(())
            } else {
                Err(PatternError::NoMatch)
            }
        }
    }
}

fn is_ellipsis_terminal(p_tail: &Value) -> bool {
    matches!(p_tail, Value::Pair(h, t) if matches!(h.as_ref(), Value::Ellipsis) && matches!(t.as_ref(), Value::Nil))
}

fn match_pair(
    p_head: &Value,
    p_tail: &Value,
    expr: &Value,
    bindings: &mut Bindings,
) -> Result<(), PatternError> {
    if !matches!(expr, Value::Pair(_, _) | Value::Nil) {
        return Err(PatternError::NoMatch);
    }

    if is_ellipsis_terminal(p_tail) {
        return match_ellipsis(p_head, expr, bindings);
    }

    match expr {
        Value::Pair(e_head, e_tail) => {
            match_pattern(p_head, e_head, bindings)?;
            match_pattern(p_tail, e_tail, bindings)
        }
        Value::Nil => Err(PatternError::NoMatch),
        _ => unreachable!("checked above"),
    }
}

/// `p_head` matches zero or more leading elements of `expr` greedily;
/// each repetition's bindings accumulate into per-key lists. The
/// remainder after consuming every Pair node must be exactly `Nil` —
/// this both enforces the "ellipsis must be terminal" rule and rejects
/// dotted tails after an ellipsis.
fn match_ellipsis(p_head: &Value, expr: &Value, bindings: &mut Bindings) -> Result<(), PatternError> {
    let vars = collect_pattern_vars(p_head);
    let mut per_key: HashMap<Symbol, Vec<Value>> = vars.iter().map(|v| (v.clone(), Vec::new())).collect();

    let mut cursor = expr;
    loop {
        match cursor {
            Value::Pair(head, tail) => {
                let mut local = Bindings::new();
                match_pattern(p_head, head, &mut local)?;
                for v in &vars {
                    if let Some(Binding::One(val)) = local.get(v) {
                        per_key.get_mut(v).unwrap().push(val.clone());
                    }
                }
                cursor = tail;
            }
            _ => break,
        }
    }

    if !matches!(cursor, Value::Nil) {
        return Err(PatternError::NoMatch);
    }

    for (k, vals) in per_key {
        bindings.insert(k, Binding::Many(vals));
    }
    Ok(())
}

/// Collects every Symbol a pattern would bind (excluding `_`, and
/// excluding anything inside a `Quoted` literal, which binds nothing).
fn collect_pattern_vars(pattern: &Value) -> Vec<Symbol> {
    let mut out = Vec::new();
    collect_pattern_vars_into(pattern, &mut out);
    out
}

fn collect_pattern_vars_into(pattern: &Value, out: &mut Vec<Symbol>) {
    match pattern {
        Value::Symbol(s) if s.as_str() != "_" => out.push(s.clone()),
        Value::Pair(head, tail) => {
            collect_pattern_vars_into(head, out);
            collect_pattern_vars_into(tail, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    fn list(items: Vec<Value>) -> Value {
        Value::from_sequence(items)
    }

    #[test]
    fn literal_pattern_binds_each_position() {
        let pattern = list(vec![sym("a"), sym("b"), sym("c")]);
        let expr = list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        let mut bindings = Bindings::new();
        match_pattern(&pattern, &expr, &mut bindings).unwrap();
        assert_eq!(bindings.get(&Symbol::new("a")), Some(&Binding::One(Value::int(1))));
        assert_eq!(bindings.get(&Symbol::new("b")), Some(&Binding::One(Value::int(2))));
        assert_eq!(bindings.get(&Symbol::new("c")), Some(&Binding::One(Value::int(3))));
    }

    #[test]
    fn pattern_matches_itself() {
        let pattern = list(vec![sym("a"), sym("b"), sym("c")]);
        let mut bindings = Bindings::new();
        match_pattern(&pattern, &pattern, &mut bindings).unwrap();
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn ellipsis_binds_remaining_elements_as_list() {
        let pattern = list(vec![sym("_"), sym("x"), Value::Ellipsis]);
        let expr = list(vec![sym("f"), Value::int(1), Value::int(2), Value::int(3)]);
        let mut bindings = Bindings::new();
        match_pattern(&pattern, &expr, &mut bindings).unwrap();
        assert_eq!(
            bindings.get(&Symbol::new("x")),
            Some(&Binding::Many(vec![Value::int(1), Value::int(2), Value::int(3)]))
        );
    }

    #[test]
    fn ellipsis_matches_zero_elements() {
        let pattern = list(vec![sym("_"), sym("x"), Value::Ellipsis]);
        let expr = list(vec![sym("f")]);
        let mut bindings = Bindings::new();
        match_pattern(&pattern, &expr, &mut bindings).unwrap();
        assert_eq!(bindings.get(&Symbol::new("x")), Some(&Binding::Many(vec![])));
    }

    #[test]
    fn non_terminal_ellipsis_is_a_match_error() {
        let pattern = Value::Pair(
            Arc::new(sym("x")),
            Arc::new(Value::Pair(Arc::new(Value::Ellipsis), Arc::new(sym("y")))),
        );
        let expr = list(vec![Value::int(1), Value::int(2)]);
        let mut bindings = Bindings::new();
        assert!(match_pattern(&pattern, &expr, &mut bindings).is_err());
    }

    #[test]
    fn quoted_pattern_requires_exact_equality() {
        let pattern = Value::Quoted(Arc::new(sym("foo")));
        let mut bindings = Bindings::new();
        assert!(match_pattern(&pattern, &sym("foo"), &mut bindings).is_ok());
        assert!(match_pattern(&pattern, &sym("bar"), &mut bindings).is_err());
        assert!(bindings.is_empty());
    }
}
