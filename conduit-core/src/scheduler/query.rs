//! Layout queries the scheduler makes during a tick.
//!
//! All of them are pure for the duration of one tick.

use crate::callback::{
    CallbackDefinition, CallbackId, CallbackInstance, CallbackRegistry, CanonicalIdentity, Slot,
};
use crate::error::IdentityError;
use crate::layout::{Address, DependencySpec, PathIndex};

/// Read-only view of the layout and callback definitions.
pub trait LayoutQuery {
    /// Dedupe key of an instance.
    fn canonical_identity(&self, instance: &CallbackInstance)
        -> Result<CanonicalIdentity, IdentityError>;

    /// Concrete outputs the instance addresses right now. Empty when none
    /// of them exist.
    fn resolve_outputs(&self, instance: &CallbackInstance) -> Vec<Address>;

    /// Concrete inputs the instance reads right now.
    fn resolve_inputs(&self, instance: &CallbackInstance) -> Vec<Address>;

    /// Concrete state the instance reads right now.
    fn resolve_state(&self, instance: &CallbackInstance) -> Vec<Address>;

    /// Whether the dependency at `slot` of `callback` can match several addresses.
    fn is_multi_valued(&self, callback: &CallbackId, slot: Slot) -> bool;

    /// Number of declared inputs of `callback`.
    fn input_count(&self, callback: &CallbackId) -> usize;

    /// Copy of `instance` bound to `outputs`.
    fn rebound(&self, instance: &CallbackInstance, outputs: Vec<Address>) -> CallbackInstance;

    /// Whether `callback` has inputs and all of them are multi-valued.
    fn all_inputs_multi_valued(&self, callback: &CallbackId) -> bool {
        let count = self.input_count(callback);
        count > 0 && (0..count).all(|i| self.is_multi_valued(callback, Slot::Input(i)))
    }
}

/// [`LayoutQuery`] over a path index and a registry.
#[derive(Debug, Clone, Copy)]
pub struct LayoutView<'a> {
    paths: &'a PathIndex,
    registry: &'a CallbackRegistry,
}

impl<'a> LayoutView<'a> {
    /// Create a view.
    pub fn new(paths: &'a PathIndex, registry: &'a CallbackRegistry) -> Self {
        Self { paths, registry }
    }

    /// The path index.
    pub fn paths(&self) -> &'a PathIndex {
        self.paths
    }

    /// The registry.
    pub fn registry(&self) -> &'a CallbackRegistry {
        self.registry
    }

    /// Check an instance's identity and record its current outputs.
    pub fn bind(&self, instance: CallbackInstance) -> Result<CallbackInstance, IdentityError> {
        self.canonical_identity(&instance)?;
        let outputs = self.resolve_outputs(&instance);
        Ok(instance.with_outputs(outputs))
    }

    fn resolve_with(
        &self,
        instance: &CallbackInstance,
        specs: fn(&CallbackDefinition) -> &[DependencySpec],
    ) -> Vec<Address> {
        let Some(definition) = self.registry.get(instance.callback()) else {
            return Vec::new();
        };
        specs(definition)
            .iter()
            .flat_map(|spec| self.paths.resolve(spec, instance.bindings()))
            .collect()
    }
}

impl LayoutQuery for LayoutView<'_> {
    fn canonical_identity(
        &self,
        instance: &CallbackInstance,
    ) -> Result<CanonicalIdentity, IdentityError> {
        let definition = self
            .registry
            .get(instance.callback())
            .ok_or_else(|| IdentityError::UnknownCallback(instance.callback().clone()))?;
        CanonicalIdentity::derive(definition, instance)
    }

    fn resolve_outputs(&self, instance: &CallbackInstance) -> Vec<Address> {
        self.resolve_with(instance, CallbackDefinition::outputs)
    }

    fn resolve_inputs(&self, instance: &CallbackInstance) -> Vec<Address> {
        self.resolve_with(instance, CallbackDefinition::inputs)
    }

    fn resolve_state(&self, instance: &CallbackInstance) -> Vec<Address> {
        self.resolve_with(instance, CallbackDefinition::state_specs)
    }

    fn is_multi_valued(&self, callback: &CallbackId, slot: Slot) -> bool {
        self.registry
            .get(callback)
            .is_some_and(|definition| definition.is_multi_valued(slot))
    }

    fn input_count(&self, callback: &CallbackId) -> usize {
        self.registry
            .get(callback)
            .map_or(0, |definition| definition.inputs().len())
    }

    fn rebound(&self, instance: &CallbackInstance, outputs: Vec<Address>) -> CallbackInstance {
        instance.rebound(outputs, self.paths)
    }
}
