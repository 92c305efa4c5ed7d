//! Lifecycle Store
//!
//! The store owns every live callback instance and the completed callbacks
//! still held for their execution group.
//!
//! # Mutation paths
//!
//! 1. `request`: external triggers append to `requested`.
//! 2. `apply`: a scheduler batch, validated in full before anything changes.
//! 3. `transition` / `complete`: the executor moving instances it owns.
//!
//! Every successful mutation bumps the revision. A batch carries the
//! revision of the snapshot it was computed from, and is refused if the
//! store moved on in the meantime.

use std::collections::HashSet;

use indexmap::IndexMap;

use super::batch::{Batch, Mutation};
use super::bin::{Bin, Entry, InstanceKey};
use super::snapshot::Snapshot;
use crate::callback::{CallbackInstance, ExecutionGroupId, ExecutionMeta, StoredCallback};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Live {
    bin: Bin,
    instance: CallbackInstance,
}

/// Owner of all callback lifecycle state.
#[derive(Debug, Clone, Default)]
pub struct LifecycleStore {
    /// Bumped on every mutation.
    revision: u64,

    /// Next key to hand out.
    next_key: u64,

    /// Live instances keyed by store key. Insertion order is arrival order
    /// into the current bin.
    live: IndexMap<InstanceKey, Live>,

    /// Completed instances held until their group settles.
    stored: Vec<StoredCallback>,
}

impl LifecycleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn allocate(&mut self) -> InstanceKey {
        let key = InstanceKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    fn insert(&mut self, bin: Bin, instance: CallbackInstance) -> InstanceKey {
        let key = self.allocate();
        self.live.insert(key, Live { bin, instance });
        key
    }

    /// Append an instance to `requested`.
    pub fn request(&mut self, instance: CallbackInstance) -> InstanceKey {
        let key = self.insert(Bin::Requested, instance);
        self.revision += 1;
        tracing::trace!(%key, revision = self.revision, "requested");
        key
    }

    /// Append several instances to `requested`, in order.
    pub fn request_all(
        &mut self,
        instances: impl IntoIterator<Item = CallbackInstance>,
    ) -> Vec<InstanceKey> {
        let keys: Vec<_> = instances
            .into_iter()
            .map(|instance| self.insert(Bin::Requested, instance))
            .collect();
        if !keys.is_empty() {
            self.revision += 1;
        }
        keys
    }

    /// Look up a live instance.
    pub fn get(&self, key: InstanceKey) -> Option<(Bin, &CallbackInstance)> {
        self.live.get(&key).map(|live| (live.bin, &live.instance))
    }

    /// Live entries of one bin, in arrival order.
    pub fn entries(&self, bin: Bin) -> impl Iterator<Item = (InstanceKey, &CallbackInstance)> {
        self.live
            .iter()
            .filter(move |(_, live)| live.bin == bin)
            .map(|(key, live)| (*key, &live.instance))
    }

    /// Number of instances in one bin.
    pub fn len(&self, bin: Bin) -> usize {
        self.entries(bin).count()
    }

    /// Whether no instance is live.
    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }

    /// Completed callbacks still held for their group.
    pub fn stored(&self) -> &[StoredCallback] {
        &self.stored
    }

    /// Take an owned view of the current state.
    pub fn snapshot(&self) -> Snapshot {
        let mut bins: [Vec<Entry>; 5] = Default::default();
        for (key, live) in &self.live {
            bins[live.bin.index()].push(Entry {
                key: *key,
                instance: live.instance.clone(),
            });
        }
        Snapshot::new(self.revision, bins, self.stored.clone())
    }

    fn check(&self, key: InstanceKey, expected: Bin) -> Result<(), StoreError> {
        let live = self.live.get(&key).ok_or(StoreError::UnknownInstance(key))?;
        if live.bin != expected {
            return Err(StoreError::WrongBin {
                key,
                expected,
                actual: live.bin,
            });
        }
        Ok(())
    }

    /// Apply a scheduler batch atomically.
    ///
    /// Removes run before adds. Added instances get fresh keys. Settled
    /// execution groups are released afterwards, even for an empty batch.
    pub fn apply(&mut self, batch: &Batch) -> Result<(), StoreError> {
        if batch.revision() != self.revision {
            return Err(StoreError::StaleBatch {
                batch: batch.revision(),
                store: self.revision,
            });
        }

        let mut removing = HashSet::new();
        for mutation in batch.mutations() {
            if let Mutation::Remove { bin, keys, .. } = mutation {
                for key in keys {
                    self.check(*key, *bin)?;
                    if !removing.insert(*key) {
                        return Err(StoreError::DuplicateRemoval(*key));
                    }
                }
            }
        }

        for mutation in batch.mutations() {
            if let Mutation::Remove { keys, .. } = mutation {
                for key in keys {
                    self.live.shift_remove(key);
                }
            }
        }
        for mutation in batch.mutations() {
            if let Mutation::Add { bin, instances, .. } = mutation {
                for instance in instances {
                    self.insert(*bin, instance.clone());
                }
            }
        }

        let released = self.release_settled_groups();
        if !batch.is_empty() || released > 0 {
            self.revision += 1;
        }
        tracing::trace!(
            revision = self.revision,
            mutations = batch.mutations().len(),
            released,
            "applied batch"
        );
        Ok(())
    }

    /// Move an instance between bins on behalf of the executor.
    ///
    /// Allowed: prioritized to blocked or executing, blocked to executing
    /// or back to prioritized, executing to watched. The instance keeps its
    /// key and goes to the back of the target bin.
    pub fn transition(&mut self, key: InstanceKey, from: Bin, to: Bin) -> Result<(), StoreError> {
        let allowed = matches!(
            (from, to),
            (Bin::Prioritized, Bin::Blocked)
                | (Bin::Prioritized, Bin::Executing)
                | (Bin::Blocked, Bin::Executing)
                | (Bin::Blocked, Bin::Prioritized)
                | (Bin::Executing, Bin::Watched)
        );
        if !allowed {
            return Err(StoreError::IllegalTransition { from, to });
        }
        self.check(key, from)?;

        if let Some(mut live) = self.live.shift_remove(&key) {
            live.bin = to;
            self.live.insert(key, live);
        }
        self.revision += 1;
        tracing::trace!(%key, %from, %to, "transition");
        Ok(())
    }

    /// Retire an executing or watched instance.
    ///
    /// Grouped instances are held in `stored` with `meta` until their group
    /// has no live members left.
    pub fn complete(
        &mut self,
        key: InstanceKey,
        meta: ExecutionMeta,
    ) -> Result<CallbackInstance, StoreError> {
        let bin = self
            .live
            .get(&key)
            .map(|live| live.bin)
            .ok_or(StoreError::UnknownInstance(key))?;
        if !matches!(bin, Bin::Executing | Bin::Watched) {
            return Err(StoreError::WrongBin {
                key,
                expected: Bin::Executing,
                actual: bin,
            });
        }

        let live = self
            .live
            .shift_remove(&key)
            .ok_or(StoreError::UnknownInstance(key))?;
        if live.instance.execution_group().is_some() {
            self.stored.push(StoredCallback {
                instance: live.instance.clone(),
                meta,
            });
        }
        self.revision += 1;
        tracing::trace!(%key, instance = %live.instance, "completed");
        Ok(live.instance)
    }

    fn release_settled_groups(&mut self) -> usize {
        let live_groups: HashSet<ExecutionGroupId> = self
            .live
            .values()
            .filter_map(|live| live.instance.execution_group())
            .collect();
        let before = self.stored.len();
        self.stored.retain(|stored| {
            stored
                .instance
                .execution_group()
                .is_some_and(|group| live_groups.contains(&group))
        });
        before - self.stored.len()
    }
}
