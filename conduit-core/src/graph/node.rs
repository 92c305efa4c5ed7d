//! Graph Nodes
//!
//! This module defines the per-callback node stored in the dependency graph.

use indexmap::IndexSet;

use crate::callback::CallbackId;

/// A callback in the dependency graph.
#[derive(Debug, Clone)]
pub struct CallbackNode {
    /// The callback this node stands for.
    id: CallbackId,

    /// Callbacks whose outputs this callback reads (parents in the graph).
    dependencies: IndexSet<CallbackId>,

    /// Callbacks that read this callback's outputs (children in the graph).
    dependents: IndexSet<CallbackId>,

    /// Whether one of the callback's outputs is also one of its inputs.
    self_referential: bool,
}

impl CallbackNode {
    /// Create a node with no edges.
    pub fn new(id: CallbackId) -> Self {
        Self {
            id,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
            self_referential: false,
        }
    }

    /// Get the node's callback id.
    pub fn id(&self) -> &CallbackId {
        &self.id
    }

    /// Add a dependency (a callback whose outputs this one reads).
    pub fn add_dependency(&mut self, id: CallbackId) {
        self.dependencies.insert(id);
    }

    /// Get all dependencies.
    pub fn dependencies(&self) -> &IndexSet<CallbackId> {
        &self.dependencies
    }

    /// Add a dependent (a callback that reads this one's outputs).
    pub fn add_dependent(&mut self, id: CallbackId) {
        self.dependents.insert(id);
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &IndexSet<CallbackId> {
        &self.dependents
    }

    /// Mark the callback as reading one of its own outputs.
    pub fn mark_self_referential(&mut self) {
        self.self_referential = true;
    }

    /// Whether the callback reads one of its own outputs.
    ///
    /// Self edges are kept out of the dependency sets so they never make
    /// the graph cyclic.
    pub fn is_self_referential(&self) -> bool {
        self.self_referential
    }

    /// Whether nothing upstream writes this callback's inputs.
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }
}
