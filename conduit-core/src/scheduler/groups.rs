//! Execution-group pruning
//!
//! A ready instance whose execution group already has completed members is
//! dropped when nothing it reads was updated by the group, and every one of
//! its inputs was writable by the group. In that case the group's earlier
//! callbacks chose not to touch its inputs. Callbacks without inputs, or
//! whose inputs are all multi-valued, are always kept.

use std::collections::{HashMap, HashSet};

use super::query::LayoutQuery;
use crate::callback::{CallbackInstance, ExecutionGroupId, StoredCallback};
use crate::layout::Address;

#[derive(Debug, Default)]
struct GroupProps<'a> {
    all: HashSet<&'a Address>,
    updated: HashSet<&'a Address>,
}

/// Props written so far by each execution group.
#[derive(Debug, Default)]
pub(super) struct GroupLedger<'a> {
    groups: HashMap<ExecutionGroupId, GroupProps<'a>>,
}

impl<'a> GroupLedger<'a> {
    pub fn new(stored: &'a [StoredCallback]) -> Self {
        let mut ledger = Self::default();
        for callback in stored {
            let Some(group) = callback.instance.execution_group() else {
                continue;
            };
            let props = ledger.groups.entry(group).or_default();
            props.all.extend(&callback.meta.all_props);
            props.updated.extend(&callback.meta.updated_props);
        }
        ledger
    }

    /// Whether `instance` has become irrelevant within its group.
    pub fn is_irrelevant<Q>(&self, query: &Q, instance: &CallbackInstance) -> bool
    where
        Q: LayoutQuery + ?Sized,
    {
        let Some(props) = instance
            .execution_group()
            .and_then(|group| self.groups.get(&group))
        else {
            return false;
        };

        let callback = instance.callback();
        if query.input_count(callback) == 0 || query.all_inputs_multi_valued(callback) {
            return false;
        }

        let inputs = query.resolve_inputs(instance);
        let untouched = inputs.iter().all(|input| !props.updated.contains(input));
        let covered = inputs.iter().all(|input| props.all.contains(input));
        untouched && covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CallbackDefinition, CallbackRegistry, ExecutionMeta};
    use crate::layout::{DependencySpec, KeyValue, PathIndex, Selector, TreePath};
    use crate::scheduler::LayoutView;

    fn fixture() -> (PathIndex, CallbackRegistry) {
        let mut paths = PathIndex::new();
        for id in ["p1", "p2", "p3", "out"] {
            paths.insert(id, TreePath::root());
        }
        let reader = |id: &str, prop: &str| {
            CallbackDefinition::new(id)
                .input(DependencySpec::exact(prop, "value"))
                .output(DependencySpec::exact("out", id))
        };
        let registry = CallbackRegistry::from_definitions([
            reader("reads-p1", "p1"),
            reader("reads-p2", "p2"),
            reader("reads-p3", "p3"),
            CallbackDefinition::new("reads-all")
                .input(DependencySpec::pattern([("x", Selector::All)], "value"))
                .output(DependencySpec::exact("out", "all")),
            CallbackDefinition::new("no-inputs").output(DependencySpec::exact("out", "none")),
        ])
        .unwrap();
        (paths, registry)
    }

    fn stored(group: ExecutionGroupId) -> StoredCallback {
        StoredCallback {
            instance: CallbackInstance::new("writer").in_group(group),
            meta: ExecutionMeta {
                all_props: [Address::new("p1", "value"), Address::new("p2", "value")]
                    .into_iter()
                    .collect(),
                updated_props: [Address::new("p1", "value")].into_iter().collect(),
            },
        }
    }

    #[test]
    fn drops_only_untouched_covered_inputs() {
        let (paths, registry) = fixture();
        let view = LayoutView::new(&paths, &registry);
        let group = ExecutionGroupId::new();
        let stored = [stored(group)];
        let ledger = GroupLedger::new(&stored);

        let instance = |id: &str| CallbackInstance::new(id).in_group(group);
        assert!(!ledger.is_irrelevant(&view, &instance("reads-p1")));
        assert!(ledger.is_irrelevant(&view, &instance("reads-p2")));
        assert!(!ledger.is_irrelevant(&view, &instance("reads-p3")));
    }

    #[test]
    fn keeps_multi_valued_and_input_free_callbacks() {
        let (mut paths, registry) = fixture();
        paths.insert(
            crate::layout::ComponentId::keyed([("x", KeyValue::from(1))]),
            TreePath::root(),
        );
        let view = LayoutView::new(&paths, &registry);
        let group = ExecutionGroupId::new();
        let stored = [stored(group)];
        let ledger = GroupLedger::new(&stored);

        assert!(!ledger.is_irrelevant(&view, &CallbackInstance::new("reads-all").in_group(group)));
        assert!(!ledger.is_irrelevant(&view, &CallbackInstance::new("no-inputs").in_group(group)));
    }

    #[test]
    fn other_groups_are_kept() {
        let (paths, registry) = fixture();
        let view = LayoutView::new(&paths, &registry);
        let stored = [stored(ExecutionGroupId::new())];
        let ledger = GroupLedger::new(&stored);

        let instance = CallbackInstance::new("reads-p2").in_group(ExecutionGroupId::new());
        assert!(!ledger.is_irrelevant(&view, &instance));
        assert!(!ledger.is_irrelevant(&view, &CallbackInstance::new("reads-p2")));
    }
}
