//! Builtin registry.

use std::collections::HashMap;

use super::traits::{Builtin, BuiltinSchema};

/// Builtins by name.
#[derive(Default)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Box<dyn Builtin>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every builtin the shell ships.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        super::builtin::register_builtins(&mut registry);
        registry
    }

    /// Add a builtin, replacing any with the same name.
    pub fn register(&mut self, builtin: impl Builtin + 'static) {
        self.builtins.insert(builtin.name().to_string(), Box::new(builtin));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Builtin> {
        self.builtins.get(name).map(|b| b.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Schemas sorted by name.
    pub fn schemas(&self) -> Vec<BuiltinSchema> {
        let mut schemas: Vec<_> = self.builtins.values().map(|b| b.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }
}
