//! Transition Batches
//!
//! A batch is the complete output of one scheduling tick: an ordered list of
//! add/remove mutations per bin, plus the instances whose admission failed.
//! The store applies a batch all at once or not at all.

use serde::Serialize;

use super::bin::{Bin, InstanceKey};
use crate::callback::CallbackInstance;
use crate::error::IdentityError;

/// Why a mutation is in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// The instance has no derivable identity.
    Rejected,
    /// The instance already lists itself as a predecessor.
    CompletedLoop,
    /// A newer instance with the same identity supersedes it.
    Duplicate,
    /// Its outputs no longer resolve.
    Pruned,
    /// Its outputs resolve to a different binding.
    Rebound,
    /// Cycle resolution recorded a new predecessor on it.
    CycleBreak,
    /// Nothing it reads changed within its execution group.
    Dropped,
    /// It is ready to run.
    Promoted,
}

/// One bin mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Remove live instances from a bin.
    Remove {
        /// Bin the instances are in.
        bin: Bin,
        /// Why they are removed.
        reason: Reason,
        /// Their keys.
        keys: Vec<InstanceKey>,
    },
    /// Add new instances to a bin.
    Add {
        /// Target bin.
        bin: Bin,
        /// Why they are added.
        reason: Reason,
        /// The instances, in arrival order.
        instances: Vec<CallbackInstance>,
    },
}

impl Mutation {
    /// The bin this mutation touches.
    pub fn bin(&self) -> Bin {
        match self {
            Mutation::Remove { bin, .. } | Mutation::Add { bin, .. } => *bin,
        }
    }

    /// Why the mutation exists.
    pub fn reason(&self) -> Reason {
        match self {
            Mutation::Remove { reason, .. } | Mutation::Add { reason, .. } => *reason,
        }
    }
}

/// An instance refused by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Bin it was in.
    pub bin: Bin,
    /// Its key.
    pub key: InstanceKey,
    /// Why no identity could be derived.
    #[serde(serialize_with = "serialize_error")]
    pub error: IdentityError,
}

fn serialize_error<S: serde::Serializer>(error: &IdentityError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// The output of one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    revision: u64,
    mutations: Vec<Mutation>,
    rejections: Vec<Rejection>,
}

impl Batch {
    pub(crate) fn new(revision: u64, mutations: Vec<Mutation>, rejections: Vec<Rejection>) -> Self {
        Self {
            revision,
            mutations,
            rejections,
        }
    }

    /// An empty batch for the given store revision.
    pub fn empty(revision: u64) -> Self {
        Self::new(revision, Vec::new(), Vec::new())
    }

    /// Store revision the batch was computed from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Mutations in application order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Instances refused during the tick.
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Whether applying the batch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Keys removed from `bin`, in batch order.
    pub fn removed(&self, bin: Bin) -> Vec<InstanceKey> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Remove { bin: b, keys, .. } if *b == bin => Some(keys.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Keys removed from `bin` for `reason`.
    pub fn removed_for(&self, bin: Bin, reason: Reason) -> Vec<InstanceKey> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Remove { bin: b, reason: r, keys } if *b == bin && *r == reason => {
                    Some(keys.iter().copied())
                }
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Instances added to `bin`, in batch order.
    pub fn added(&self, bin: Bin) -> Vec<&CallbackInstance> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Add { bin: b, instances, .. } if *b == bin => Some(instances.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Instances added to `bin` for `reason`.
    pub fn added_for(&self, bin: Bin, reason: Reason) -> Vec<&CallbackInstance> {
        self.mutations
            .iter()
            .filter_map(|m| match m {
                Mutation::Add { bin: b, reason: r, instances } if *b == bin && *r == reason => {
                    Some(instances.iter())
                }
                _ => None,
            })
            .flatten()
            .collect()
    }
}
