//! Callbacks
//!
//! Static definitions (what a callback reads and writes), the registry that
//! owns them, and the instances that flow through the lifecycle bins.

mod definition;
mod identity;
mod instance;
mod registry;

pub use definition::{CallbackDefinition, CallbackId, Slot};
pub use identity::CanonicalIdentity;
pub use instance::{CallbackInstance, ExecutionGroupId, ExecutionMeta, Predecessors, StoredCallback};
pub use registry::CallbackRegistry;
