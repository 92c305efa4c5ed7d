//! Callback Definitions
//!
//! A definition is the static declaration of a callback: which properties it
//! reads (inputs and state) and which it writes (outputs). Definitions never
//! change once registered; everything dynamic lives on instances.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::DependencySpec;

/// Identifier of a callback definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(String);

impl CallbackId {
    /// Create an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallbackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CallbackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a spec inside a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The n-th input.
    Input(usize),
    /// The n-th state entry.
    State(usize),
    /// The n-th output.
    Output(usize),
}

/// Static declaration of a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackDefinition {
    id: CallbackId,
    inputs: Vec<DependencySpec>,
    #[serde(default)]
    state: Vec<DependencySpec>,
    outputs: Vec<DependencySpec>,
    #[serde(default)]
    prevent_initial_call: bool,
}

impl CallbackDefinition {
    /// Start a definition with no specs.
    pub fn new(id: impl Into<CallbackId>) -> Self {
        Self {
            id: id.into(),
            inputs: Vec::new(),
            state: Vec::new(),
            outputs: Vec::new(),
            prevent_initial_call: false,
        }
    }

    /// Add an input.
    pub fn input(mut self, spec: DependencySpec) -> Self {
        self.inputs.push(spec);
        self
    }

    /// Add a state entry.
    pub fn state(mut self, spec: DependencySpec) -> Self {
        self.state.push(spec);
        self
    }

    /// Add an output.
    pub fn output(mut self, spec: DependencySpec) -> Self {
        self.outputs.push(spec);
        self
    }

    /// Skip this callback when the layout is first rendered.
    pub fn prevent_initial_call(mut self) -> Self {
        self.prevent_initial_call = true;
        self
    }

    /// The definition id.
    pub fn id(&self) -> &CallbackId {
        &self.id
    }

    /// Declared inputs.
    pub fn inputs(&self) -> &[DependencySpec] {
        &self.inputs
    }

    /// Declared state.
    pub fn state_specs(&self) -> &[DependencySpec] {
        &self.state
    }

    /// Declared outputs.
    pub fn outputs(&self) -> &[DependencySpec] {
        &self.outputs
    }

    /// Whether the initial layout should skip this callback.
    pub fn skips_initial_call(&self) -> bool {
        self.prevent_initial_call
    }

    /// The spec at `slot`, if it exists.
    pub fn slot(&self, slot: Slot) -> Option<&DependencySpec> {
        match slot {
            Slot::Input(i) => self.inputs.get(i),
            Slot::State(i) => self.state.get(i),
            Slot::Output(i) => self.outputs.get(i),
        }
    }

    /// Whether the dependency at `slot` is multi-valued. Missing slots are not.
    pub fn is_multi_valued(&self, slot: Slot) -> bool {
        self.slot(slot).is_some_and(DependencySpec::is_multi_valued)
    }

    /// Whether the definition has inputs and every one is multi-valued.
    pub fn all_inputs_multi_valued(&self) -> bool {
        !self.inputs.is_empty() && self.inputs.iter().all(DependencySpec::is_multi_valued)
    }

    /// Every wildcard key that must be bound on an instance.
    pub fn bound_keys(&self) -> BTreeSet<&str> {
        self.inputs
            .iter()
            .chain(&self.state)
            .chain(&self.outputs)
            .flat_map(|spec| spec.bound_keys())
            .collect()
    }
}
