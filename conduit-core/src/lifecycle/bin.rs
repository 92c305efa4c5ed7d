use std::fmt;

use serde::{Deserialize, Serialize};

use crate::callback::CallbackInstance;

/// The live lifecycle bins. An instance is in exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bin {
    /// Waiting for the scheduler to decide.
    Requested,
    /// Ready; waiting for the executor.
    Prioritized,
    /// Picked up by the executor but waiting on the app.
    Blocked,
    /// Running.
    Executing,
    /// Running, result awaited asynchronously.
    Watched,
}

impl Bin {
    /// Every bin, in scheduling order.
    pub const ALL: [Bin; 5] = [
        Bin::Requested,
        Bin::Prioritized,
        Bin::Blocked,
        Bin::Executing,
        Bin::Watched,
    ];

    /// Bins that supersede in dedupe against `requested`.
    pub const IN_FLIGHT: [Bin; 4] = [Bin::Prioritized, Bin::Blocked, Bin::Executing, Bin::Watched];

    pub(crate) fn index(self) -> usize {
        match self {
            Bin::Requested => 0,
            Bin::Prioritized => 1,
            Bin::Blocked => 2,
            Bin::Executing => 3,
            Bin::Watched => 4,
        }
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bin::Requested => "requested",
            Bin::Prioritized => "prioritized",
            Bin::Blocked => "blocked",
            Bin::Executing => "executing",
            Bin::Watched => "watched",
        };
        f.write_str(name)
    }
}

/// Store-assigned key of a live instance. Keys increase with arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceKey(u64);

impl InstanceKey {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw key value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A live instance together with its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Store key.
    pub key: InstanceKey,
    /// The instance.
    pub instance: CallbackInstance,
}
