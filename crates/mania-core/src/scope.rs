use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::symbol::Symbol;
use crate::value::Value;

/// A lexical environment: a local bindings map plus an optional parent.
/// Bindings live behind a `Mutex` rather than a `RefCell` because a
/// Module's exports scope is read by every Process that imports it, and
/// those Processes may run on different Scheduler threads (see
/// SPEC_FULL.md §3).
pub struct Scope {
    parent: Option<Arc<Scope>>,
    locals: Mutex<HashMap<Symbol, Value>>,
}

impl Scope {
    pub fn root() -> Arc<Scope> {
        Arc::new(Scope {
            parent: None,
            locals: Mutex::new(HashMap::new()),
        })
    }

    pub fn child(parent: Arc<Scope>) -> Arc<Scope> {
        Arc::new(Scope {
            parent: Some(parent),
            locals: Mutex::new(HashMap::new()),
        })
    }

    /// Binds `name` to `value` in this scope. Refuses to clobber an
    /// existing non-Annotation binding; an existing Annotation is
    /// replaced (the annotation is considered "not yet defined").
    ///
    /// Returns `false` if a real binding already existed.
    pub fn define(&self, name: Symbol, value: Value) -> bool {
        let mut locals = self.locals.lock().unwrap();
        if let Some(existing) = locals.get(&name) {
            if !matches!(existing, Value::Annotation(_)) {
                return false;
            }
        }
        locals.insert(name, value);
        true
    }

    /// Looks up `name`. A binding present *locally* as an Annotation is
    /// unbound outright — it does not fall through to a parent's binding
    /// of the same name, it only delegates to the parent when `name`
    /// isn't present locally at all (matching the reference frame's
    /// `Scope.lookup`, which raises as soon as a local Annotation is
    /// found rather than walking further up).
    pub fn lookup(&self, name: &Symbol) -> Option<Value> {
        let locals = self.locals.lock().unwrap();
        match locals.get(name) {
            Some(Value::Annotation(_)) => None,
            Some(v) => Some(v.clone()),
            None => {
                drop(locals);
                self.parent.as_ref().and_then(|p| p.lookup(name))
            }
        }
    }

    /// Looks up `name` in this scope only, without walking parents, and
    /// without treating an Annotation as absent. Used by field access on
    /// a module's exports scope.
    pub fn lookup_local(&self, name: &Symbol) -> Option<Value> {
        self.locals.lock().unwrap().get(name).cloned()
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let root = Scope::root();
        root.define(Symbol::new("x"), Value::Bool(true));
        let child = Scope::child(root);
        assert_eq!(child.lookup(&Symbol::new("x")), Some(Value::Bool(true)));
        assert_eq!(child.lookup(&Symbol::new("y")), None);
    }

    #[test]
    fn define_refuses_to_clobber_real_binding() {
        let scope = Scope::root();
        assert!(scope.define(Symbol::new("x"), Value::Bool(true)));
        assert!(!scope.define(Symbol::new("x"), Value::Bool(false)));
        assert_eq!(scope.lookup(&Symbol::new("x")), Some(Value::Bool(true)));
    }

    #[test]
    fn define_over_annotation_succeeds() {
        let scope = Scope::root();
        scope.define(Symbol::new("x"), Value::Annotation(None));
        assert!(scope.define(Symbol::new("x"), Value::Bool(true)));
        assert_eq!(scope.lookup(&Symbol::new("x")), Some(Value::Bool(true)));
    }

    #[test]
    fn local_annotation_shadows_parent_binding_as_unbound() {
        let root = Scope::root();
        root.define(Symbol::new("x"), Value::Bool(true));
        let child = Scope::child(root);
        child.define(Symbol::new("x"), Value::Annotation(None));
        assert_eq!(child.lookup(&Symbol::new("x")), None);
    }

    #[test]
    fn annotation_with_no_outer_binding_is_unbound() {
        let scope = Scope::root();
        scope.define(Symbol::new("x"), Value::Annotation(None));
        assert_eq!(scope.lookup(&Symbol::new("x")), None);
    }
}
