//! Callback Scheduler
//!
//! The scheduler is a pure transition function: given a snapshot of the
//! lifecycle bins and a view of the layout, it computes the one batch of
//! mutations that moves ready callbacks forward. It never touches the store;
//! the caller applies the batch and serializes ticks.
//!
//! # Steps
//!
//! 1. Admission: instances without a canonical identity are rejected.
//! 2. Completed loops: requested instances listing themselves as a
//!    predecessor are removed.
//! 3. Dedupe: at most one live instance per identity survives.
//! 4. Prune: instances whose outputs vanished are removed; changed
//!    bindings are replaced.
//! 5. Readiness: requested instances reading no pending output are ready.
//!    If none is, and requested is all that is pending, the requested
//!    instances are in a loop and one is entered speculatively.
//! 6. Group drop: ready instances made irrelevant by their execution
//!    group are removed.
//! 7. Promotion: the remaining ready instances move to `prioritized`.
//!
//! A tick over a snapshot that already reflects its own batch produces an
//! empty batch.

mod cycles;
mod dedupe;
mod groups;
mod prune;
mod query;
mod readiness;
mod working;

use crate::config::SchedulerConfig;
use crate::lifecycle::{Batch, Bin, Reason, Snapshot};

use groups::GroupLedger;
use working::{BatchBuilder, WorkingSet};

pub use query::{LayoutQuery, LayoutView};

/// Computes transition batches.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run one tick over `snapshot`.
    pub fn tick<Q>(&self, query: &Q, snapshot: &Snapshot) -> Batch
    where
        Q: LayoutQuery + ?Sized,
    {
        let mut batch = BatchBuilder::new(snapshot.revision());
        let mut work = WorkingSet::admit(query, snapshot, &mut batch);

        if self.config.prune_completed_loops {
            cycles::prune_completed_loops(&mut work, &mut batch);
        }
        dedupe::dedupe(&mut work, &mut batch);
        prune::prune(query, &mut work, &mut batch);

        let pending = work.outputs();
        let pending_len = work.live_len();
        let requested = work.take(Bin::Requested);
        let mut ready = readiness::ready(query, &requested, &pending);

        let mut annotated = 0;
        if ready.is_empty()
            && !requested.is_empty()
            && requested.len() == pending_len
            && self.config.resolve_cycles
        {
            let entry = cycles::enter_loop(query, &requested);
            for (index, predecessor) in &entry.annotated {
                let item = &requested[*index];
                batch.remove(Bin::Requested, Reason::CycleBreak, item.handle);
                batch.add(
                    Bin::Requested,
                    Reason::CycleBreak,
                    item.instance.with_predecessor(predecessor.clone()),
                );
            }
            annotated = entry.annotated.len();
            ready = entry.accepted;
        }

        let ledger = GroupLedger::new(snapshot.stored());
        let (dropped, promoted): (Vec<usize>, Vec<usize>) = ready.into_iter().partition(|&index| {
            self.config.drop_irrelevant && ledger.is_irrelevant(query, &requested[index].instance)
        });
        for &index in &dropped {
            tracing::trace!(instance = %requested[index].instance, "irrelevant in group");
            batch.remove(Bin::Requested, Reason::Dropped, requested[index].handle);
        }
        for &index in &promoted {
            let item = &requested[index];
            batch.remove(Bin::Requested, Reason::Promoted, item.handle);
            batch.add(Bin::Prioritized, Reason::Promoted, item.instance.clone());
        }

        let initial = promoted
            .iter()
            .filter(|&&index| requested[index].instance.is_initial_call())
            .count();

        let batch = batch.finish();
        tracing::debug!(
            revision = snapshot.revision(),
            requested = requested.len(),
            pending = pending_len,
            promoted = promoted.len(),
            initial,
            dropped = dropped.len(),
            annotated,
            rejected = batch.rejections().len(),
            mutations = batch.mutations().len(),
            "scheduler tick"
        );
        batch
    }
}
