//! Error Types
//!
//! Faults are scoped to the concern that raises them. None of these abort a
//! scheduling tick: identity failures reject a single instance, store
//! failures reject a single batch.

use crate::callback::CallbackId;
use crate::lifecycle::{Bin, InstanceKey};

/// No canonical identity can be derived for a callback instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The instance refers to a definition the registry does not know.
    #[error("unknown callback: {0}")]
    UnknownCallback(CallbackId),

    /// A `MATCH` or `ALLSMALLER` selector has no bound value on the instance.
    #[error("callback {callback}: wildcard key '{key}' has no binding")]
    UnboundWildcard {
        /// The offending definition.
        callback: CallbackId,
        /// The pattern key that is missing a value.
        key: String,
    },
}

/// Error registering a callback definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A definition with the same id was already registered.
    #[error("duplicate callback: {0}")]
    DuplicateCallback(CallbackId),

    /// A definition declares no outputs.
    #[error("callback {0} declares no outputs")]
    NoOutputs(CallbackId),

    /// `ALLSMALLER` is only valid on inputs and state.
    #[error("callback {0}: ALLSMALLER is not allowed in outputs")]
    AllSmallerOutput(CallbackId),
}

/// Error mutating the lifecycle store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The batch was computed against an older revision of the store.
    #[error("stale batch: computed at revision {batch}, store is at {store}")]
    StaleBatch {
        /// Revision the batch was computed from.
        batch: u64,
        /// Current store revision.
        store: u64,
    },

    /// The key does not name a live instance.
    #[error("unknown instance {0}")]
    UnknownInstance(InstanceKey),

    /// The instance is live but not in the expected bin.
    #[error("instance {key} is in {actual}, expected {expected}")]
    WrongBin {
        /// The instance.
        key: InstanceKey,
        /// Bin the caller expected.
        expected: Bin,
        /// Bin the instance is actually in.
        actual: Bin,
    },

    /// The same instance is removed twice within one batch.
    #[error("instance {0} removed twice in one batch")]
    DuplicateRemoval(InstanceKey),

    /// The requested bin transition is not an executor transition.
    #[error("transition {from} -> {to} is not allowed")]
    IllegalTransition {
        /// Source bin.
        from: Bin,
        /// Target bin.
        to: Bin,
    },
}

/// Error loading a [`SchedulerConfig`](crate::config::SchedulerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The input is not valid JSON for the config schema.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid config field '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why the value was refused.
        reason: String,
    },
}

/// Error talking to a running [`Dispatcher`](crate::runtime::Dispatcher).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The dispatcher task has shut down.
    #[error("dispatcher is closed")]
    Closed,

    /// The operation reached the runtime and failed there.
    #[error(transparent)]
    Store(#[from] StoreError),
}
