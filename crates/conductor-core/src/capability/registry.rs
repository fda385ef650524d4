//! Capability registry for name-based dispatch.
//!
//! Populated once when the engine is built; lookups of unregistered names
//! fail with [`RegistryError::UnknownCapability`].

use std::collections::HashMap;

use thiserror::Error;

use super::boxed::BoxCapability;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown capability: '{0}'")]
    UnknownCapability(String),
}

/// Registry of available capabilities, indexed by name.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, BoxCapability>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability under the given name.
    ///
    /// If a capability with this name already exists, it is replaced.
    pub fn register(&mut self, name: impl Into<String>, capability: BoxCapability) {
        self.capabilities.insert(name.into(), capability);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, capability: BoxCapability) -> Self {
        self.register(name, capability);
        self
    }

    /// Look up a capability by name.
    pub fn resolve(&self, name: &str) -> Result<&BoxCapability, RegistryError> {
        self.capabilities
            .get(name)
            .ok_or_else(|| RegistryError::UnknownCapability(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
