use serde::Serialize;

use super::bin::{Bin, Entry};
use crate::callback::StoredCallback;

/// A consistent, owned view of the store at one revision.
///
/// The scheduler reads only snapshots; it never holds the store itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    revision: u64,
    bins: [Vec<Entry>; 5],
    stored: Vec<StoredCallback>,
}

impl Snapshot {
    pub(crate) fn new(revision: u64, bins: [Vec<Entry>; 5], stored: Vec<StoredCallback>) -> Self {
        Self {
            revision,
            bins,
            stored,
        }
    }

    /// Store revision this snapshot was taken at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Entries of one bin, in arrival order.
    pub fn bin(&self, bin: Bin) -> &[Entry] {
        &self.bins[bin.index()]
    }

    /// Completed callbacks whose group is still active.
    pub fn stored(&self) -> &[StoredCallback] {
        &self.stored
    }

    /// Number of live instances across all bins.
    pub fn live_len(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Whether no instance is live.
    pub fn is_idle(&self) -> bool {
        self.live_len() == 0
    }
}
