//! Tick-local working state.
//!
//! The tick works on owned copies of the bins and records every change in a
//! [`BatchBuilder`]. Instances the tick itself adds get a provisional handle;
//! if a later step removes one of those again, the add is withdrawn instead
//! of emitting a removal for a key the store never assigned.

use std::collections::HashSet;

use super::query::LayoutQuery;
use crate::callback::{CallbackInstance, CanonicalIdentity};
use crate::error::IdentityError;
use crate::layout::Address;
use crate::lifecycle::{Batch, Bin, InstanceKey, Mutation, Reason, Rejection, Snapshot};

/// Where an instance in the working set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Handle {
    /// Live in the store under this key.
    Stored(InstanceKey),
    /// Added earlier in this tick.
    Provisional(usize),
}

/// One instance in the working set.
#[derive(Debug, Clone)]
pub(super) struct Item {
    pub handle: Handle,
    pub instance: CallbackInstance,
    pub identity: CanonicalIdentity,
}

#[derive(Debug)]
enum Pending {
    Remove {
        bin: Bin,
        reason: Reason,
        keys: Vec<InstanceKey>,
    },
    Add {
        bin: Bin,
        reason: Reason,
        instances: Vec<(usize, CallbackInstance)>,
    },
}

/// Accumulates the mutations of one tick.
///
/// Mutations sharing an operation, a bin and a reason are merged into one
/// entry at the position of the first of them.
#[derive(Debug)]
pub(super) struct BatchBuilder {
    revision: u64,
    pending: Vec<Pending>,
    rejections: Vec<Rejection>,
    next_provisional: usize,
}

impl BatchBuilder {
    pub fn new(revision: u64) -> Self {
        Self {
            revision,
            pending: Vec::new(),
            rejections: Vec::new(),
            next_provisional: 0,
        }
    }

    pub fn remove(&mut self, bin: Bin, reason: Reason, handle: Handle) {
        match handle {
            Handle::Stored(key) => {
                let existing = self.pending.iter_mut().find_map(|pending| match pending {
                    Pending::Remove {
                        bin: b,
                        reason: r,
                        keys,
                    } if *b == bin && *r == reason => Some(keys),
                    _ => None,
                });
                match existing {
                    Some(keys) => keys.push(key),
                    None => self.pending.push(Pending::Remove {
                        bin,
                        reason,
                        keys: vec![key],
                    }),
                }
            }
            Handle::Provisional(id) => {
                for pending in &mut self.pending {
                    if let Pending::Add { instances, .. } = pending {
                        instances.retain(|(provisional, _)| *provisional != id);
                    }
                }
            }
        }
    }

    pub fn add(&mut self, bin: Bin, reason: Reason, instance: CallbackInstance) -> Handle {
        let id = self.next_provisional;
        self.next_provisional += 1;

        let existing = self.pending.iter_mut().find_map(|pending| match pending {
            Pending::Add {
                bin: b,
                reason: r,
                instances,
            } if *b == bin && *r == reason => Some(instances),
            _ => None,
        });
        match existing {
            Some(instances) => instances.push((id, instance)),
            None => self.pending.push(Pending::Add {
                bin,
                reason,
                instances: vec![(id, instance)],
            }),
        }
        Handle::Provisional(id)
    }

    pub fn reject(&mut self, bin: Bin, key: InstanceKey, error: IdentityError) {
        tracing::warn!(%bin, %key, %error, "rejected callback instance");
        self.remove(bin, Reason::Rejected, Handle::Stored(key));
        self.rejections.push(Rejection { bin, key, error });
    }

    pub fn finish(self) -> Batch {
        let mutations = self
            .pending
            .into_iter()
            .filter_map(|pending| match pending {
                Pending::Remove { bin, reason, keys } => {
                    (!keys.is_empty()).then_some(Mutation::Remove { bin, reason, keys })
                }
                Pending::Add {
                    bin,
                    reason,
                    instances,
                } => (!instances.is_empty()).then(|| Mutation::Add {
                    bin,
                    reason,
                    instances: instances.into_iter().map(|(_, instance)| instance).collect(),
                }),
            })
            .collect();
        Batch::new(self.revision, mutations, self.rejections)
    }
}

/// Owned copies of the live bins.
#[derive(Debug, Default)]
pub(super) struct WorkingSet {
    bins: [Vec<Item>; 5],
}

impl WorkingSet {
    /// Load every live instance whose identity can be derived. The rest are
    /// rejected into `batch`.
    pub fn admit<Q>(query: &Q, snapshot: &Snapshot, batch: &mut BatchBuilder) -> Self
    where
        Q: LayoutQuery + ?Sized,
    {
        let mut work = Self::default();
        for bin in Bin::ALL {
            for entry in snapshot.bin(bin) {
                match query.canonical_identity(&entry.instance) {
                    Ok(identity) => work.bins[bin.index()].push(Item {
                        handle: Handle::Stored(entry.key),
                        instance: entry.instance.clone(),
                        identity,
                    }),
                    Err(error) => batch.reject(bin, entry.key, error),
                }
            }
        }
        work
    }

    pub fn take(&mut self, bin: Bin) -> Vec<Item> {
        std::mem::take(&mut self.bins[bin.index()])
    }

    pub fn put(&mut self, bin: Bin, items: Vec<Item>) {
        self.bins[bin.index()] = items;
    }

    #[cfg(test)]
    pub fn bin(&self, bin: Bin) -> &[Item] {
        &self.bins[bin.index()]
    }

    /// Number of instances across all bins.
    pub fn live_len(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Recorded outputs of every instance across all bins.
    pub fn outputs(&self) -> HashSet<Address> {
        self.bins
            .iter()
            .flatten()
            .flat_map(|item| item.instance.outputs().iter().cloned())
            .collect()
    }
}
