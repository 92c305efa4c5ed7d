//! Callback Lifecycle
//!
//! Every callback instance lives in exactly one bin:
//!
//! ```text
//! requested -> prioritized -> blocked -> executing -> watched
//!                   ^            |          |           |
//!                   +------------+          +-----------+--> stored / gone
//! ```
//!
//! The scheduler only ever moves instances out of `requested` (and
//! re-annotates or prunes them in place). Everything after `prioritized` is
//! driven by the executor through [`LifecycleStore::transition`] and
//! [`LifecycleStore::complete`].

mod batch;
mod bin;
mod snapshot;
mod store;

pub use batch::{Batch, Mutation, Reason, Rejection};
pub use bin::{Bin, Entry, InstanceKey};
pub use snapshot::Snapshot;
pub use store::LifecycleStore;
