//! Hygienic pattern/template macro engine: matches an S-expression
//! against a macro rule's pattern, then expands the rule's template
//! against the resulting bindings.

pub mod error;
pub mod pattern;
pub mod template;

pub use error::PatternError;

use mania_core::{Bindings, Rule, Value};

/// Tries each of a macro's `Rule`s in order, returning the first
/// successful match's expanded template sequence (§4.2 — a rule's body
/// is `templates…`, expanded in order; the engine's output is that
/// sequence of expansions, each later compiled and capped with `Eval`).
/// Re-raises only once every rule has failed to match (§7 — Testable
/// Property 7).
pub fn expand_macro(rules: &[Rule], expr: &Value) -> Result<Vec<Value>, PatternError> {
    for rule in rules {
        let mut bindings = Bindings::new();
        if pattern::match_pattern(&rule.pattern, expr, &mut bindings).is_ok() {
            return rule
                .templates
                .iter()
                .map(|t| template::expand(t, &bindings))
                .collect();
        }
    }
    Err(PatternError::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mania_core::Symbol;
    use std::sync::Arc;

    fn sym(s: &str) -> Value {
        Value::symbol(s)
    }

    fn list(items: Vec<Value>) -> Value {
        Value::from_sequence(items)
    }

    #[test]
    fn dispatch_tries_rules_in_order_and_uses_first_match() {
        let rule_zero = Rule {
            pattern: list(vec![sym("_"), Value::Quoted(Arc::new(Value::int(0)))]),
            templates: vec![Value::Quasiquoted(Arc::new(Value::int(100)))],
        };
        let rule_any = Rule {
            pattern: list(vec![sym("_"), sym("n")]),
            templates: vec![Value::Quasiquoted(Arc::new(Value::Unquoted(Arc::new(sym("n")))))],
        };
        let rules = vec![rule_zero, rule_any];

        let matches_first = list(vec![sym("f"), Value::int(0)]);
        assert_eq!(expand_macro(&rules, &matches_first).unwrap(), vec![Value::int(100)]);

        let matches_second = list(vec![sym("f"), Value::int(7)]);
        assert_eq!(expand_macro(&rules, &matches_second).unwrap(), vec![Value::int(7)]);
    }

    #[test]
    fn dispatch_fails_when_no_rule_matches() {
        let _ = Symbol::new("unused");
        let rule = Rule {
            pattern: Value::Quoted(Arc::new(sym("only"))),
            templates: vec![Value::int(1)],
        };
        let rules = vec![rule];
        let expr = sym("other");
        assert!(expand_macro(&rules, &expr).is_err());
    }
}
