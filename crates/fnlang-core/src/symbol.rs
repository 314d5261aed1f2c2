use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::value::Value;

/// A scope's name bindings plus an optional parent scope.
///
/// `get` walks the parent chain; `set` always writes the current table.
/// Names are arbitrary UTF-8 (operator names like `+` or `:true` included)
/// and are stored verbatim. The table is shared between contexts — a
/// closure context aliases its parent's table outright — so bindings live
/// behind a lock.
pub struct SymbolTable {
    bindings: RwLock<HashMap<String, Value>>,
    parent: Option<Arc<SymbolTable>>,
}

impl SymbolTable {
    pub fn new() -> Arc<SymbolTable> {
        Arc::new(SymbolTable {
            bindings: RwLock::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn with_parent(parent: Arc<SymbolTable>) -> Arc<SymbolTable> {
        Arc::new(SymbolTable {
            bindings: RwLock::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let found = self
            .bindings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned();
        match found {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let table = SymbolTable::new();
        table.set("x", Value::int(1));
        assert_eq!(table.get("x"), Some(Value::int(1)));
        assert_eq!(table.get("y"), None);
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let root = SymbolTable::new();
        root.set("x", Value::int(1));
        let child = SymbolTable::with_parent(Arc::clone(&root));
        assert_eq!(child.get("x"), Some(Value::int(1)));

        // shadowing in the child does not touch the parent
        child.set("x", Value::int(2));
        assert_eq!(child.get("x"), Some(Value::int(2)));
        assert_eq!(root.get("x"), Some(Value::int(1)));
    }

    #[test]
    fn operator_names_stored_verbatim() {
        let table = SymbolTable::new();
        table.set("+", Value::int(1));
        table.set(":true", Value::int(2));
        assert_eq!(table.get("+"), Some(Value::int(1)));
        assert_eq!(table.get(":true"), Some(Value::int(2)));
    }
}
