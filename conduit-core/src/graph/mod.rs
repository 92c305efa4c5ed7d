//! Dependency Graph
//!
//! This module implements the callback-level dependency graph built from the
//! registered definitions.
//!
//! # Overview
//!
//! - Nodes are callback definitions.
//! - There is an edge from A to B when some output of A can address the same
//!   property as some input of B. Wildcard specs overlap whenever their key
//!   sets agree and no literal values disagree.
//!
//! The graph is rebuilt whenever the registry changes and is read-only
//! otherwise. Unlike a signal graph it is *not* required to be acyclic:
//! circular callback chains are legal, and the scheduler breaks them at
//! runtime with predecessor annotations instead of rejecting them here.
//!
//! # Queries
//!
//! 1. `triggered_by`: which callbacks does a change to a concrete address
//!    trigger, and what `MATCH` values does the address bind.
//! 2. `downstream` / `in_cycle`: reachability over dependents.
//! 3. `overall_order` / `order_of`: topological ordering, with cycle members
//!    reported separately (see [`order`]).

mod node;
pub mod order;

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;

use crate::callback::{CallbackId, CallbackRegistry, Slot};
use crate::layout::{Address, Bindings, DependencySpec};

pub use node::CallbackNode;
pub use order::TopologicalOrder;

/// A callback input that a concrete address change fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// The triggered callback.
    pub callback: CallbackId,
    /// Which input matched.
    pub slot: Slot,
    /// `MATCH` values bound by the changed component.
    pub captured: Bindings,
    /// The matched input spec.
    pub spec: DependencySpec,
}

#[derive(Debug, Clone)]
struct InputEntry {
    callback: CallbackId,
    index: usize,
    spec: DependencySpec,
}

/// Callback-level dependency graph.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// All nodes, in registration order.
    nodes: IndexMap<CallbackId, CallbackNode>,

    /// Every declared input, in registration order.
    inputs: Vec<InputEntry>,

    /// Position of each callback in the overall order.
    priorities: IndexMap<CallbackId, usize>,
}

impl DependencyGraph {
    /// Build the graph for every definition in `registry`.
    pub fn build(registry: &CallbackRegistry) -> Self {
        let mut graph = Self::default();

        for definition in registry.iter() {
            let id = definition.id().clone();
            graph.nodes.insert(id.clone(), CallbackNode::new(id.clone()));
            for (index, spec) in definition.inputs().iter().enumerate() {
                graph.inputs.push(InputEntry {
                    callback: id.clone(),
                    index,
                    spec: spec.clone(),
                });
            }
        }

        for writer in registry.iter() {
            for reader in registry.iter() {
                let overlaps = writer
                    .outputs()
                    .iter()
                    .any(|out| reader.inputs().iter().any(|input| out.may_overlap(input)));
                if !overlaps {
                    continue;
                }
                if writer.id() == reader.id() {
                    if let Some(node) = graph.nodes.get_mut(writer.id()) {
                        node.mark_self_referential();
                    }
                } else {
                    graph.add_edge(writer.id(), reader.id());
                }
            }
        }

        let order = graph.overall_order();
        graph.priorities = order
            .order
            .iter()
            .chain(&order.cyclic)
            .enumerate()
            .map(|(position, id)| (id.clone(), position))
            .collect();

        tracing::debug!(
            callbacks = graph.nodes.len(),
            inputs = graph.inputs.len(),
            cyclic = order.cyclic.len(),
            "built dependency graph"
        );
        graph
    }

    /// Add a dependency edge: `dependent` reads what `dependency` writes.
    fn add_edge(&mut self, dependency: &CallbackId, dependent: &CallbackId) {
        if let Some(node) = self.nodes.get_mut(dependency) {
            node.add_dependent(dependent.clone());
        }
        if let Some(node) = self.nodes.get_mut(dependent) {
            node.add_dependency(dependency.clone());
        }
    }

    /// Get a node.
    pub fn node(&self, id: &CallbackId) -> Option<&CallbackNode> {
        self.nodes.get(id)
    }

    /// All callback ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &CallbackId> {
        self.nodes.keys()
    }

    /// Position of `id` in [`overall_order`](Self::overall_order), cyclic
    /// members last. Computed once per build.
    pub fn priority(&self, id: &CallbackId) -> Option<usize> {
        self.priorities.get(id).copied()
    }

    /// Number of callbacks in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no callbacks.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every callback input fired by a change to `address`.
    ///
    /// State specs never fire. Results are in registration order.
    pub fn triggered_by(&self, address: &Address) -> Vec<Trigger> {
        self.inputs
            .iter()
            .filter(|entry| entry.spec.property == address.property)
            .filter_map(|entry| {
                entry.spec.capture(&address.component).map(|captured| Trigger {
                    callback: entry.callback.clone(),
                    slot: Slot::Input(entry.index),
                    captured,
                    spec: entry.spec.clone(),
                })
            })
            .collect()
    }

    /// Every callback reachable from `id` through dependents, excluding `id`
    /// unless it lies on a cycle through itself.
    pub fn downstream(&self, id: &CallbackId) -> Vec<CallbackId> {
        let mut reached = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(node) = self.nodes.get(id) {
            queue.extend(node.dependents().iter());
        }

        while let Some(next) = queue.pop_front() {
            if !visited.insert(next) {
                continue;
            }
            reached.push(next.clone());
            if let Some(node) = self.nodes.get(next) {
                queue.extend(node.dependents().iter());
            }
        }

        reached
    }

    /// Whether `id` can reach itself through other callbacks.
    pub fn in_cycle(&self, id: &CallbackId) -> bool {
        self.downstream(id).contains(id)
    }

    /// Whether any callbacks form a cycle.
    pub fn is_cyclic(&self) -> bool {
        !self.overall_order().is_acyclic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::CallbackDefinition;
    use crate::layout::{ComponentId, KeyValue, Selector};

    fn link(id: &str, from: &str, to: &str) -> CallbackDefinition {
        CallbackDefinition::new(id)
            .input(DependencySpec::exact(from, "value"))
            .output(DependencySpec::exact(to, "value"))
    }

    #[test]
    fn edges_follow_outputs_into_inputs() {
        let registry = CallbackRegistry::from_definitions([
            link("a", "w", "x"),
            link("b", "x", "y"),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        let a = graph.node(&CallbackId::from("a")).unwrap();
        let b = graph.node(&CallbackId::from("b")).unwrap();
        assert!(a.dependents().contains(&CallbackId::from("b")));
        assert!(b.dependencies().contains(&CallbackId::from("a")));
        assert!(a.is_root());
        assert!(!graph.is_cyclic());
    }

    #[test]
    fn priorities_match_overall_order() {
        let registry = CallbackRegistry::from_definitions([
            link("c", "y", "z"),
            link("loop-a", "q", "p"),
            link("loop-b", "p", "q"),
            link("a", "w", "x"),
            link("b", "x", "y"),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);
        let order = graph.overall_order();

        for id in graph.ids() {
            assert_eq!(graph.priority(id), order.priority(id));
        }
        assert_eq!(graph.priority(&CallbackId::from("a")), Some(0));
        assert_eq!(graph.priority(&CallbackId::from("loop-b")), Some(4));
        assert_eq!(graph.priority(&CallbackId::from("ghost")), None);
    }

    #[test]
    fn self_reference_is_not_a_cycle() {
        let registry = CallbackRegistry::from_definitions([link("sync", "x", "x")]).unwrap();
        let graph = DependencyGraph::build(&registry);

        let node = graph.node(&CallbackId::from("sync")).unwrap();
        assert!(node.is_self_referential());
        assert!(!graph.in_cycle(&CallbackId::from("sync")));
        assert!(!graph.is_cyclic());
    }

    #[test]
    fn reachability_through_cycle() {
        let registry = CallbackRegistry::from_definitions([
            link("a", "z", "x"),
            link("b", "x", "y"),
            link("c", "y", "z"),
            link("d", "z", "q"),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        assert!(graph.in_cycle(&CallbackId::from("a")));
        assert!(!graph.in_cycle(&CallbackId::from("d")));
        let downstream = graph.downstream(&CallbackId::from("b"));
        assert!(downstream.contains(&CallbackId::from("d")));
        assert!(graph.is_cyclic());
    }

    #[test]
    fn triggered_by_captures_match_values() {
        let row = |s: Selector| {
            DependencySpec::pattern([("type", Selector::Value(KeyValue::from("row"))), ("index", s)], "value")
        };
        let registry = CallbackRegistry::from_definitions([
            CallbackDefinition::new("per-row")
                .input(row(Selector::Match))
                .output(DependencySpec::pattern(
                    [("type", Selector::Value(KeyValue::from("label"))), ("index", Selector::Match)],
                    "children",
                )),
            CallbackDefinition::new("sum")
                .input(row(Selector::All))
                .output(DependencySpec::exact("sum", "children")),
            CallbackDefinition::new("unrelated")
                .input(DependencySpec::exact("other", "value"))
                .output(DependencySpec::exact("x", "children")),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        let changed = Address::new(
            ComponentId::keyed([("type", KeyValue::from("row")), ("index", KeyValue::from(4))]),
            "value",
        );
        let triggers = graph.triggered_by(&changed);

        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].callback, CallbackId::from("per-row"));
        assert_eq!(triggers[0].captured.get("index"), Some(&KeyValue::from(4)));
        assert_eq!(triggers[1].callback, CallbackId::from("sum"));
        assert!(triggers[1].captured.is_empty());
    }

    #[test]
    fn state_dependencies_trigger_nothing() {
        let registry = CallbackRegistry::from_definitions([CallbackDefinition::new("submit")
            .input(DependencySpec::exact("form", "n_clicks"))
            .state(DependencySpec::exact("name", "value"))
            .output(DependencySpec::exact("greeting", "children"))])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        assert!(graph.triggered_by(&Address::new("name", "value")).is_empty());
        assert_eq!(graph.triggered_by(&Address::new("form", "n_clicks")).len(), 1);
    }
}
