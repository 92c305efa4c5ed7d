//! Circular dependencies
//!
//! When every pending instance is a requested one and none of them is ready,
//! the requested instances block each other in a loop. The loop is entered
//! speculatively:
//!
//! 1. Accept the head candidate as ready.
//! 2. Re-check the remaining candidates against the outputs of everything
//!    accepted so far.
//! 3. Candidates that are now blocked leave the candidate list. Those that
//!    do not list the head's callback as a predecessor yet get it recorded.
//! 4. Repeat with the next candidate until none remain.
//!
//! Recording predecessors is what ends the loop: once an instance comes back
//! around listing its own callback, [`prune_completed_loops`] removes it.

use std::collections::{HashSet, VecDeque};

use super::query::LayoutQuery;
use super::readiness::is_ready;
use super::working::{BatchBuilder, Item, WorkingSet};
use crate::callback::CallbackId;
use crate::layout::Address;
use crate::lifecycle::{Bin, Reason};

/// Remove requested instances that already list their own callback.
pub(super) fn prune_completed_loops(work: &mut WorkingSet, batch: &mut BatchBuilder) {
    let (completed, open): (Vec<Item>, Vec<Item>) = work
        .take(Bin::Requested)
        .into_iter()
        .partition(|item| item.instance.completed_loop());

    for item in completed {
        tracing::trace!(instance = %item.instance, "loop completed");
        batch.remove(Bin::Requested, Reason::CompletedLoop, item.handle);
    }
    work.put(Bin::Requested, open);
}

/// Outcome of entering a loop.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct LoopEntry {
    /// Indices accepted as ready, in acceptance order.
    pub accepted: Vec<usize>,
    /// Indices that must record a predecessor, and which one.
    pub annotated: Vec<(usize, CallbackId)>,
}

/// Enter the loop formed by `requested`.
pub(super) fn enter_loop<Q>(query: &Q, requested: &[Item]) -> LoopEntry
where
    Q: LayoutQuery + ?Sized,
{
    let mut entry = LoopEntry::default();
    let mut candidates: VecDeque<usize> = (0..requested.len()).collect();
    let mut assumed: HashSet<Address> = HashSet::new();

    while let Some(head) = candidates.pop_front() {
        let head_instance = &requested[head].instance;
        let head_callback = head_instance.callback().clone();
        entry.accepted.push(head);
        assumed.extend(head_instance.outputs().iter().cloned());

        let annotated = &mut entry.annotated;
        candidates.retain(|&index| {
            let instance = &requested[index].instance;
            if is_ready(query, instance, &assumed) {
                return true;
            }
            if !instance.predecessors().contains(&head_callback) {
                annotated.push((index, head_callback.clone()));
            }
            false
        });
    }

    tracing::trace!(
        accepted = entry.accepted.len(),
        annotated = entry.annotated.len(),
        "entered dependency loop"
    );
    entry
}

#[cfg(test)]
mod tests {
    use super::super::working::Handle;
    use super::*;
    use crate::callback::{CallbackDefinition, CallbackInstance, CallbackRegistry};
    use crate::layout::{DependencySpec, PathIndex, TreePath};
    use crate::lifecycle::LifecycleStore;
    use crate::scheduler::LayoutView;

    fn link(id: &str, from: &[&str], to: &str) -> CallbackDefinition {
        from.iter()
            .fold(CallbackDefinition::new(id), |def, f| def.input(DependencySpec::exact(*f, "value")))
            .output(DependencySpec::exact(to, "value"))
    }

    fn admitted(view: &LayoutView<'_>, names: &[&str]) -> Vec<Item> {
        let mut store = LifecycleStore::new();
        for name in names {
            store.request(view.bind(CallbackInstance::new(*name)).unwrap());
        }
        let mut batch = BatchBuilder::new(store.revision());
        let mut work = WorkingSet::admit(view, &store.snapshot(), &mut batch);
        work.take(Bin::Requested)
    }

    #[test]
    fn mutual_loop_accepts_one() {
        let mut paths = PathIndex::new();
        for id in ["x", "y", "z"] {
            paths.insert(id, TreePath::root());
        }
        let registry = CallbackRegistry::from_definitions([
            link("a", &["y", "z"], "x"),
            link("b", &["x", "z"], "y"),
            link("c", &["x", "y"], "z"),
        ])
        .unwrap();
        let view = LayoutView::new(&paths, &registry);
        let requested = admitted(&view, &["a", "b", "c"]);

        let entry = enter_loop(&view, &requested);
        assert_eq!(entry.accepted, vec![0]);
        assert_eq!(
            entry.annotated,
            vec![(1, CallbackId::from("a")), (2, CallbackId::from("a"))]
        );
    }

    #[test]
    fn ring_accepts_every_other() {
        let mut paths = PathIndex::new();
        for id in ["x", "y", "z"] {
            paths.insert(id, TreePath::root());
        }
        let registry = CallbackRegistry::from_definitions([
            link("a", &["z"], "x"),
            link("b", &["x"], "y"),
            link("c", &["y"], "z"),
        ])
        .unwrap();
        let view = LayoutView::new(&paths, &registry);
        let requested = admitted(&view, &["a", "b", "c"]);

        let entry = enter_loop(&view, &requested);
        assert_eq!(entry.accepted, vec![0, 2]);
        assert_eq!(entry.annotated, vec![(1, CallbackId::from("a"))]);
    }

    #[test]
    fn existing_predecessor_is_not_repeated() {
        let mut paths = PathIndex::new();
        for id in ["x", "y"] {
            paths.insert(id, TreePath::root());
        }
        let registry =
            CallbackRegistry::from_definitions([link("a", &["y"], "x"), link("b", &["x"], "y")])
                .unwrap();
        let view = LayoutView::new(&paths, &registry);
        let mut requested = admitted(&view, &["a", "b"]);
        requested[1].instance = requested[1].instance.with_predecessor(CallbackId::from("a"));

        let entry = enter_loop(&view, &requested);
        assert_eq!(entry.accepted, vec![0]);
        assert!(entry.annotated.is_empty());
    }

    #[test]
    fn completed_loops_are_removed() {
        let mut store = LifecycleStore::new();
        let done = store.request(CallbackInstance::new("a").with_predecessor(CallbackId::from("a")));
        store.request(CallbackInstance::new("b").with_predecessor(CallbackId::from("a")));
        let paths = PathIndex::new();
        let registry = CallbackRegistry::from_definitions([
            link("a", &["y"], "x"),
            link("b", &["x"], "y"),
        ])
        .unwrap();
        let view = LayoutView::new(&paths, &registry);

        let mut batch = BatchBuilder::new(store.revision());
        let mut work = WorkingSet::admit(&view, &store.snapshot(), &mut batch);
        prune_completed_loops(&mut work, &mut batch);

        assert_eq!(work.bin(Bin::Requested).len(), 1);
        assert_ne!(work.bin(Bin::Requested)[0].handle, Handle::Stored(done));
        assert_eq!(batch.finish().removed_for(Bin::Requested, Reason::CompletedLoop), vec![done]);
    }
}
