//! Callback Registry
//!
//! Owns every definition for the lifetime of an app. Lookup is by id;
//! iteration is in registration order, which is the tie-breaker the
//! dependency graph uses for callbacks inside a cycle.

use indexmap::IndexMap;

use super::definition::{CallbackDefinition, CallbackId};
use crate::error::RegistryError;
use crate::layout::Selector;

/// The set of registered callback definitions.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    definitions: IndexMap<CallbackId, CallbackDefinition>,
}

impl CallbackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from definitions, stopping at the first invalid one.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = CallbackDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Register a definition.
    pub fn register(&mut self, definition: CallbackDefinition) -> Result<(), RegistryError> {
        let id = definition.id().clone();
        if self.definitions.contains_key(&id) {
            return Err(RegistryError::DuplicateCallback(id));
        }
        if definition.outputs().is_empty() {
            return Err(RegistryError::NoOutputs(id));
        }
        if definition
            .outputs()
            .iter()
            .any(|spec| !spec.keys_with(&Selector::AllSmaller).is_empty())
        {
            return Err(RegistryError::AllSmallerOutput(id));
        }

        tracing::trace!(callback = %id, "registered callback");
        self.definitions.insert(id, definition);
        Ok(())
    }

    /// Look up a definition.
    pub fn get(&self, id: &CallbackId) -> Option<&CallbackDefinition> {
        self.definitions.get(id)
    }

    /// All definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &CallbackDefinition> {
        self.definitions.values()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definitions are registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
