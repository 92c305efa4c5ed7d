//! Topological Ordering
//!
//! Orders callbacks so that a callback comes after every callback whose
//! outputs it reads. Ordering uses Kahn's algorithm restricted to the
//! requested subset: only edges between members of the subset count.
//!
//! Reactive graphs are allowed to be cyclic. Members of a cycle (and
//! anything downstream of one inside the subset) can never reach in-degree
//! zero; they are reported separately, in the order they were given, rather
//! than being dropped.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;

use super::DependencyGraph;
use crate::callback::CallbackId;

/// Result of ordering a set of callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Callbacks in dependency order.
    pub order: Vec<CallbackId>,
    /// Callbacks that could not be ordered because of a cycle.
    pub cyclic: Vec<CallbackId>,
}

impl TopologicalOrder {
    /// Whether every callback was ordered.
    pub fn is_acyclic(&self) -> bool {
        self.cyclic.is_empty()
    }

    /// Position of `id` in the ordering, cyclic members last.
    pub fn priority(&self, id: &CallbackId) -> Option<usize> {
        self.order
            .iter()
            .chain(&self.cyclic)
            .position(|candidate| candidate == id)
    }
}

impl DependencyGraph {
    /// Order a subset of callbacks. Ids the graph does not know are ignored.
    pub fn order_of<'a>(&self, ids: impl IntoIterator<Item = &'a CallbackId>) -> TopologicalOrder {
        let subset: IndexSet<&CallbackId> = ids
            .into_iter()
            .filter(|id| self.node(id).is_some())
            .collect();

        let mut in_degree: HashMap<&CallbackId, usize> = HashMap::new();
        let mut queue = VecDeque::new();

        // Calculate in-degrees (only counting edges within the subset)
        for &id in &subset {
            let degree = self
                .node(id)
                .map(|node| {
                    node.dependencies()
                        .iter()
                        .filter(|d| subset.contains(d))
                        .count()
                })
                .unwrap_or(0);
            in_degree.insert(id, degree);
            if degree == 0 {
                queue.push_back(id);
            }
        }

        let mut order = Vec::with_capacity(subset.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.clone());

            if let Some(node) = self.node(id) {
                for dependent in node.dependents() {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        let cyclic = subset
            .iter()
            .filter(|id| in_degree.get(*id).is_some_and(|d| *d > 0))
            .map(|id| (*id).clone())
            .collect();

        TopologicalOrder { order, cyclic }
    }

    /// Order every callback in the graph, ties broken by registration order.
    pub fn overall_order(&self) -> TopologicalOrder {
        self.order_of(self.ids())
    }
}

#[cfg(test)]
mod tests {
    use crate::callback::{CallbackDefinition, CallbackId, CallbackRegistry};
    use crate::graph::DependencyGraph;
    use crate::layout::DependencySpec;

    fn link(id: &str, from: &str, to: &str) -> CallbackDefinition {
        CallbackDefinition::new(id)
            .input(DependencySpec::exact(from, "value"))
            .output(DependencySpec::exact(to, "value"))
    }

    fn ids(list: &[CallbackId]) -> Vec<&str> {
        list.iter().map(CallbackId::as_str).collect()
    }

    #[test]
    fn chain_is_ordered_upstream_first() {
        // registered out of order on purpose
        let registry = CallbackRegistry::from_definitions([
            link("c", "y", "z"),
            link("a", "w", "x"),
            link("b", "x", "y"),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        let order = graph.overall_order();
        assert!(order.is_acyclic());
        assert_eq!(ids(&order.order), vec!["a", "b", "c"]);
        assert_eq!(order.priority(&CallbackId::from("b")), Some(1));
    }

    #[test]
    fn cycle_members_are_reported() {
        let registry = CallbackRegistry::from_definitions([
            link("a", "z", "x"),
            link("b", "x", "y"),
            link("c", "y", "z"),
            link("d", "q", "r"),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        let order = graph.overall_order();
        assert_eq!(ids(&order.order), vec!["d"]);
        assert_eq!(ids(&order.cyclic), vec!["a", "b", "c"]);
        assert_eq!(order.priority(&CallbackId::from("a")), Some(1));
    }

    #[test]
    fn subset_ignores_outside_edges() {
        let registry = CallbackRegistry::from_definitions([
            link("a", "w", "x"),
            link("b", "x", "y"),
            link("c", "y", "z"),
        ])
        .unwrap();
        let graph = DependencyGraph::build(&registry);

        let subset = [CallbackId::from("c"), CallbackId::from("a")];
        let order = graph.order_of(&subset);
        assert_eq!(ids(&order.order), vec!["c", "a"]);
    }
}
