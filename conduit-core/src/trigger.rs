//! Request Creation
//!
//! Turns external events into callback instances for `requested`:
//!
//! - a prop change fires every callback with a matching input,
//! - an initial render fires every callback not flagged
//!   `prevent_initial_call`, and so do components added to a live layout,
//! - a completion fires the callbacks reading what the completed callback
//!   updated, carrying its execution group and predecessor chain.
//!
//! Wildcard callbacks fire once per distinct `MATCH` binding found among
//! their output components. Instances with the same identity produced by
//! one event are merged. Results are sorted by the graph's overall order.

use indexmap::{IndexMap, IndexSet};

use crate::callback::{
    CallbackDefinition, CallbackId, CallbackInstance, ExecutionGroupId, Predecessors,
};
use crate::graph::{DependencyGraph, Trigger};
use crate::layout::{Address, Bindings, ComponentId, Selector};
use crate::scheduler::LayoutView;

/// Creates instances for external events.
#[derive(Debug, Clone, Copy)]
pub struct Triggers<'a> {
    graph: &'a DependencyGraph,
    view: LayoutView<'a>,
}

impl<'a> Triggers<'a> {
    /// Create a trigger source.
    pub fn new(graph: &'a DependencyGraph, view: LayoutView<'a>) -> Self {
        Self { graph, view }
    }

    /// Instances fired by user changes to `changed`. All of them share one
    /// fresh execution group.
    pub fn prop_change(&self, changed: &[Address]) -> Vec<CallbackInstance> {
        self.fire(changed, Some(ExecutionGroupId::new()), &Predecessors::default())
    }

    /// Follow-up instances after `parent` wrote `updated`.
    pub fn completion(&self, parent: &CallbackInstance, updated: &[Address]) -> Vec<CallbackInstance> {
        let predecessors = parent.predecessors().appended(parent.callback().clone());
        self.fire(updated, parent.execution_group(), &predecessors)
    }

    /// Instances for the first render of the current layout.
    pub fn initial_layout(&self) -> Vec<CallbackInstance> {
        let fired = self.initial_calls(|definition| self.output_bindings(definition));
        tracing::debug!(fired = fired.len(), "initial layout callbacks");
        fired
    }

    /// Instances for the first render of components that just appeared in
    /// the layout. Only bindings whose outputs include one of `added` fire.
    pub fn layout_added(&self, added: &[ComponentId]) -> Vec<CallbackInstance> {
        if added.is_empty() {
            return Vec::new();
        }
        let fired = self.initial_calls(|definition| {
            let found: IndexSet<Bindings> = definition
                .outputs()
                .iter()
                .flat_map(|spec| added.iter().filter_map(move |id| spec.capture(id)))
                .collect();
            found.into_iter().collect()
        });
        tracing::debug!(added = added.len(), fired = fired.len(), "added component callbacks");
        fired
    }

    fn initial_calls<F>(&self, bindings_of: F) -> Vec<CallbackInstance>
    where
        F: Fn(&CallbackDefinition) -> Vec<Bindings>,
    {
        let group = ExecutionGroupId::new();
        let mut fired = Vec::new();

        for definition in self.view.registry().iter() {
            if definition.skips_initial_call() {
                continue;
            }
            for bindings in bindings_of(definition) {
                let instance = CallbackInstance::new(definition.id().clone())
                    .with_bindings(bindings)
                    .in_group(group)
                    .as_initial_call();
                if let Ok(bound) = self.view.bind(instance) {
                    if !bound.outputs().is_empty() {
                        fired.push(bound);
                    }
                }
            }
        }

        self.sorted(fired)
    }

    fn fire(
        &self,
        changed: &[Address],
        group: Option<ExecutionGroupId>,
        predecessors: &Predecessors,
    ) -> Vec<CallbackInstance> {
        let mut merged: IndexMap<(CallbackId, Bindings), CallbackInstance> = IndexMap::new();

        for address in changed {
            for trigger in self.graph.triggered_by(address) {
                let Some(definition) = self.view.registry().get(&trigger.callback) else {
                    continue;
                };
                for bindings in self.trigger_bindings(definition, &trigger, address) {
                    let mut instance = CallbackInstance::new(trigger.callback.clone())
                        .with_bindings(bindings.clone())
                        .with_changed_prop(address.clone())
                        .with_predecessors(predecessors.clone());
                    if let Some(group) = group {
                        instance = instance.in_group(group);
                    }
                    match merged.get_mut(&(trigger.callback.clone(), bindings.clone())) {
                        Some(existing) => existing.merge_changed_props(&instance),
                        None => {
                            merged.insert((trigger.callback.clone(), bindings), instance);
                        }
                    }
                }
            }
        }

        let fired: Vec<_> = merged
            .into_values()
            .map(|instance| self.view.bind(instance.clone()).unwrap_or(instance))
            .collect();
        tracing::debug!(changed = changed.len(), fired = fired.len(), "prop change callbacks");
        self.sorted(fired)
    }

    /// Distinct `MATCH` bindings among the output components of `definition`.
    /// A definition without wildcard keys has exactly one, empty, binding.
    fn output_bindings(&self, definition: &CallbackDefinition) -> Vec<Bindings> {
        if definition.bound_keys().is_empty() {
            return vec![Bindings::new()];
        }
        let found: IndexSet<Bindings> = definition
            .outputs()
            .iter()
            .flat_map(|spec| self.view.paths().bindings_for(spec))
            .collect();
        found.into_iter().collect()
    }

    /// Bindings under which `trigger` fires for a change to `address`.
    fn trigger_bindings(
        &self,
        definition: &CallbackDefinition,
        trigger: &Trigger,
        address: &Address,
    ) -> Vec<Bindings> {
        let smaller: Vec<_> = trigger
            .spec
            .keys_with(&Selector::AllSmaller)
            .into_iter()
            .filter_map(|key| {
                let keys = address.component.keys()?;
                keys.get(key).map(|value| (key, value))
            })
            .collect();

        self.output_bindings(definition)
            .into_iter()
            .filter(|bindings| {
                trigger
                    .captured
                    .iter()
                    .all(|(key, value)| bindings.get(key).map_or(true, |bound| bound == value))
            })
            .filter(|bindings| {
                smaller.iter().all(|(key, changed)| {
                    bindings.get(*key).is_some_and(|bound| changed.precedes(bound))
                })
            })
            .map(|mut bindings| {
                for (key, value) in &trigger.captured {
                    bindings.entry(key.clone()).or_insert_with(|| value.clone());
                }
                bindings
            })
            .collect()
    }

    fn sorted(&self, mut instances: Vec<CallbackInstance>) -> Vec<CallbackInstance> {
        instances.sort_by_key(|instance| {
            self.graph.priority(instance.callback()).unwrap_or(usize::MAX)
        });
        instances
    }
}
