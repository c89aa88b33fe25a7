use mania_core::{Symbol, Value};

/// Resolves a colon-containing name (`mod:field`, `outer:inner:field`,
/// ...) against a lexical scope once a plain `scope.lookup` has already
/// failed. Tries the name's module-prefix segments longest to shortest;
/// the first prefix that resolves to a bound `Module` wins, and every
/// segment after it is descended one field lookup at a time (chaining
/// through nested Modules if an intermediate segment is itself a
/// Module). Returns `None` if no prefix resolves, or a segment along
/// the way isn't exported.
pub fn resolve(scope: &mania_core::Scope, sym: &Symbol) -> Option<Value> {
    let segments = sym.colon_segments()?;
    let n = segments.len();

    for split in (1..n).rev() {
        let prefix = Symbol::new(segments[..split].join(":"));
        let Some(Value::Module(module)) = scope.lookup(&prefix) else {
            continue;
        };

        let remaining = &segments[split..];
        if let Some(value) = descend(&module, remaining) {
            return Some(value);
        }
    }
    None
}

fn descend(module: &mania_core::ModuleData, remaining: &[&str]) -> Option<Value> {
    let exports = module.scope.lock().unwrap().clone()?;
    let (first, rest) = remaining.split_first()?;
    let value = exports.lookup_local(&Symbol::new(*first))?;

    if rest.is_empty() {
        return Some(value);
    }
    match value {
        Value::Module(inner) => descend(&inner, rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mania_core::{ModuleData, Scope};
    use std::sync::{Arc, Mutex};

    fn leaf_module(name: &str, field: &str, value: Value) -> Arc<ModuleData> {
        let exports = Scope::root();
        exports.define(Symbol::new(field), value);
        Arc::new(ModuleData {
            name: Symbol::new(name),
            entry_point: 0,
            constants: vec![Value::Symbol(Symbol::new(name))],
            instructions: Vec::new(),
            scope: Mutex::new(Some(exports)),
        })
    }

    #[test]
    fn resolves_a_single_segment_field() {
        let root = Scope::root();
        let module = leaf_module("m", "x", Value::int(42));
        root.define(Symbol::new("m"), Value::Module(module));

        assert_eq!(resolve(&root, &Symbol::new("m:x")), Some(Value::int(42)));
    }

    #[test]
    fn resolves_nested_module_chains() {
        let root = Scope::root();
        let inner_field = leaf_module("inner", "y", Value::int(7));
        let outer_exports = Scope::root();
        outer_exports.define(Symbol::new("inner"), Value::Module(inner_field));
        let outer = Arc::new(ModuleData {
            name: Symbol::new("outer"),
            entry_point: 0,
            constants: vec![Value::Symbol(Symbol::new("outer"))],
            instructions: Vec::new(),
            scope: Mutex::new(Some(outer_exports)),
        });
        root.define(Symbol::new("outer"), Value::Module(outer));

        assert_eq!(resolve(&root, &Symbol::new("outer:inner:y")), Some(Value::int(7)));
    }

    #[test]
    fn missing_field_fails_closed() {
        let root = Scope::root();
        let module = leaf_module("m", "x", Value::int(1));
        root.define(Symbol::new("m"), Value::Module(module));

        assert_eq!(resolve(&root, &Symbol::new("m:missing")), None);
    }

    #[test]
    fn non_colon_name_has_no_path() {
        let root = Scope::root();
        assert_eq!(resolve(&root, &Symbol::new("plain")), None);
    }
}
