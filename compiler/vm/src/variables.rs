use std::collections::HashMap;

use xeno_container::Value;

/// Name-keyed variable environment. Bindings are erased on program load;
/// reading an unbound name is non-fatal and handled by the dispatch loop.
#[derive(Default)]
pub struct VariableTable {
    bindings: HashMap<String, Value>,
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable::default()
    }

    pub fn store(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn load(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).copied()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings sorted by name, for deterministic state dumps.
    pub fn sorted(&self) -> Vec<(&str, Value)> {
        let mut entries: Vec<(&str, Value)> = self
            .bindings
            .iter()
            .map(|(k, &v)| (k.as_str(), v))
            .collect();
        entries.sort_by_key(|&(name, _)| name);
        entries
    }
}
