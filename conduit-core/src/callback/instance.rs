//! Callback Instances
//!
//! An instance is one concrete, bound occurrence of a callback moving through
//! the lifecycle bins. Instances are values: the scheduler never edits one in
//! place. Recording a new predecessor or a new output binding produces a new
//! instance, and the batch removes the old value and adds the new one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::definition::CallbackId;
use crate::layout::{Address, Bindings, KeyValue, PathIndex};

/// Identifier shared by every instance spawned from one external trigger.
///
/// Ids are only minted by [`ExecutionGroupId::new`], from one process-wide
/// counter, so two groups never share an id. Hosts reuse an id they were
/// handed; they cannot make one up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionGroupId(u64);

impl ExecutionGroupId {
    /// Generate a new unique group id.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ExecutionGroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Callbacks an instance assumes must run before it.
///
/// Append-only: there is no way to remove an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predecessors(SmallVec<[CallbackId; 2]>);

impl Predecessors {
    /// Whether `id` is listed.
    pub fn contains(&self, id: &CallbackId) -> bool {
        self.0.contains(id)
    }

    /// A copy with `id` appended. Already-listed ids are not repeated.
    pub fn appended(&self, id: CallbackId) -> Self {
        let mut next = self.clone();
        if !next.contains(&id) {
            next.0.push(id);
        }
        next
    }

    /// Listed ids in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &CallbackId> {
        self.0.iter()
    }

    /// Number of listed ids.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CallbackId> for Predecessors {
    fn from_iter<I: IntoIterator<Item = CallbackId>>(ids: I) -> Self {
        ids.into_iter().fold(Self::default(), |acc, id| acc.appended(id))
    }
}

/// A bound occurrence of a callback in the scheduling pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackInstance {
    callback: CallbackId,
    #[serde(default)]
    bindings: Bindings,
    #[serde(default)]
    outputs: Vec<Address>,
    #[serde(default)]
    changed_props: IndexSet<Address>,
    #[serde(default)]
    predecessors: Predecessors,
    #[serde(default)]
    execution_group: Option<ExecutionGroupId>,
    #[serde(default)]
    initial_call: bool,
}

impl CallbackInstance {
    /// An unbound instance of `callback` with no trigger information.
    pub fn new(callback: impl Into<CallbackId>) -> Self {
        Self {
            callback: callback.into(),
            bindings: Bindings::new(),
            outputs: Vec::new(),
            changed_props: IndexSet::new(),
            predecessors: Predecessors::default(),
            execution_group: None,
            initial_call: false,
        }
    }

    /// Bind a wildcard key.
    pub fn with_binding(mut self, key: impl Into<String>, value: impl Into<KeyValue>) -> Self {
        self.bindings.insert(key.into(), value.into());
        self
    }

    /// Replace all wildcard bindings.
    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Record the concrete output binding.
    pub fn with_outputs(mut self, outputs: Vec<Address>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Add a property whose change triggered this instance.
    pub fn with_changed_prop(mut self, prop: Address) -> Self {
        self.changed_props.insert(prop);
        self
    }

    /// Assign the instance to an execution group.
    pub fn in_group(mut self, group: ExecutionGroupId) -> Self {
        self.execution_group = Some(group);
        self
    }

    /// Replace the predecessor list.
    pub fn with_predecessors(mut self, predecessors: Predecessors) -> Self {
        self.predecessors = predecessors;
        self
    }

    /// Mark the instance as part of the initial render of its components.
    ///
    /// The flag travels with the instance through every bin, rebinds and
    /// predecessor annotations included, so the executor can tell a first
    /// render from a user change.
    pub fn as_initial_call(mut self) -> Self {
        self.initial_call = true;
        self
    }

    /// A copy that also lists `id` as a predecessor.
    pub fn with_predecessor(&self, id: CallbackId) -> Self {
        let mut next = self.clone();
        next.predecessors = self.predecessors.appended(id);
        next
    }

    /// A copy re-bound to `outputs`, keeping only the changed props whose
    /// component is still in the tree.
    pub fn rebound(&self, outputs: Vec<Address>, paths: &PathIndex) -> Self {
        let mut next = self.clone();
        next.outputs = outputs;
        next.changed_props = self
            .changed_props
            .iter()
            .filter(|prop| paths.contains(&prop.component))
            .cloned()
            .collect();
        next
    }

    pub(crate) fn merge_changed_props(&mut self, other: &CallbackInstance) {
        self.changed_props.extend(other.changed_props.iter().cloned());
    }

    /// The definition this instance belongs to.
    pub fn callback(&self) -> &CallbackId {
        &self.callback
    }

    /// Wildcard bindings.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Recorded concrete outputs.
    pub fn outputs(&self) -> &[Address] {
        &self.outputs
    }

    /// Properties whose change triggered the instance.
    pub fn changed_props(&self) -> &IndexSet<Address> {
        &self.changed_props
    }

    /// Callbacks assumed to run first.
    pub fn predecessors(&self) -> &Predecessors {
        &self.predecessors
    }

    /// The execution group, if the instance came from a grouped trigger.
    pub fn execution_group(&self) -> Option<ExecutionGroupId> {
        self.execution_group
    }

    /// Whether the instance belongs to the initial layout render.
    pub fn is_initial_call(&self) -> bool {
        self.initial_call
    }

    /// Whether the instance has come back around its own dependency loop.
    pub fn completed_loop(&self) -> bool {
        self.predecessors.contains(&self.callback)
    }
}

impl fmt::Display for CallbackInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.callback)?;
        if !self.bindings.is_empty() {
            let json = serde_json::to_string(&self.bindings).map_err(|_| fmt::Error)?;
            write!(f, "{}", json)?;
        }
        Ok(())
    }
}

/// What a completed callback could have changed, and what it did change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMeta {
    /// Every output the callback was allowed to write.
    pub all_props: IndexSet<Address>,
    /// The outputs it actually changed.
    pub updated_props: IndexSet<Address>,
}

impl ExecutionMeta {
    /// Meta for an instance that wrote `updated` out of its recorded outputs.
    pub fn for_completion(
        instance: &CallbackInstance,
        updated: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            all_props: instance.outputs().iter().cloned().collect(),
            updated_props: updated.into_iter().collect(),
        }
    }
}

/// A completed instance kept while its execution group is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCallback {
    /// The completed instance.
    pub instance: CallbackInstance,
    /// What it could change and what it changed.
    pub meta: ExecutionMeta,
}
