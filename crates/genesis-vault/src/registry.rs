//! Explicit registry of known secret stores.
//!
//! The registry is passed through the executor and validator rather than
//! living in module-level state, so tests construct fresh registries instead
//! of clearing globals.

use genesis_types::traits::SecretStore;
use genesis_types::{GenesisError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A collection of named secret stores with an optional default.
#[derive(Default, Clone)]
pub struct StoreRegistry {
    stores: HashMap<String, Arc<dyn SecretStore>>,
    default: Option<String>,
}

impl StoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under its own name. The first registration becomes
    /// the default.
    pub fn register(&mut self, store: Arc<dyn SecretStore>) {
        let name = store.name().to_string();
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.stores.insert(name, store);
    }

    /// Mark a registered store as the default target.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.stores.contains_key(name) {
            return Err(GenesisError::Config(format!("Unknown secret store '{}'", name)));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    /// Look up a store by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn SecretStore>> {
        self.stores.get(name).cloned()
    }

    /// The default store, if any was registered.
    pub fn default_store(&self) -> Result<Arc<dyn SecretStore>> {
        self.default
            .as_deref()
            .and_then(|name| self.get(name))
            .ok_or_else(|| GenesisError::Config("No secret store configured".to_string()))
    }

    /// Names of all registered stores.
    pub fn names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }

    /// Number of registered stores.
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Whether any store is registered.
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_first_registration_is_default() {
        let mut registry = StoreRegistry::new();
        assert!(registry.default_store().is_err());

        registry.register(Arc::new(MemoryStore::new()));
        assert_eq!(registry.default_store().unwrap().name(), "memory");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_default_requires_known_store() {
        let mut registry = StoreRegistry::new();
        registry.register(Arc::new(MemoryStore::new()));
        assert!(registry.set_default("nope").is_err());
        assert!(registry.set_default("memory").is_ok());
    }
}
