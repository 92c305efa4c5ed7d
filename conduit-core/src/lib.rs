//! Conduit Core
//!
//! This crate provides the callback scheduler for the Conduit reactive UI
//! framework. Callbacks declare which component properties they read and
//! write; whenever something changes, the scheduler decides which pending
//! callbacks may run now.
//!
//! It implements:
//!
//! - Layout addressing with wildcard component ids
//! - A callback-level dependency graph
//! - The callback lifecycle store
//! - The scheduling transition function
//! - Synchronous and async runtime front ends
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `layout`: component ids, wildcard patterns and the path index
//! - `callback`: definitions, instances and canonical identity
//! - `graph`: dependency graph and topological ordering
//! - `lifecycle`: bins, batches and the lifecycle store
//! - `scheduler`: the per-tick transition function
//! - `trigger`: turning events into requested instances
//! - `runtime`: event loop wiring everything together
//!
//! # Example
//!
//! ```rust
//! use conduit_core::callback::{CallbackDefinition, CallbackRegistry};
//! use conduit_core::config::SchedulerConfig;
//! use conduit_core::layout::{Address, DependencySpec, PathIndex, TreePath};
//! use conduit_core::runtime::SchedulerRuntime;
//!
//! let registry = CallbackRegistry::from_definitions([CallbackDefinition::new("greet")
//!     .input(DependencySpec::exact("name", "value"))
//!     .output(DependencySpec::exact("greeting", "children"))])
//! .unwrap();
//!
//! let mut paths = PathIndex::new();
//! paths.insert("name", TreePath::root());
//! paths.insert("greeting", TreePath::root());
//!
//! let runtime = SchedulerRuntime::new(SchedulerConfig::default(), registry, paths);
//! let report = runtime.prop_changed(&[Address::new("name", "value")]).unwrap();
//! assert_eq!(report.prioritized.len(), 1);
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod lifecycle;
pub mod runtime;
pub mod scheduler;
pub mod trigger;

pub use callback::{CallbackDefinition, CallbackId, CallbackInstance, CallbackRegistry};
pub use config::SchedulerConfig;
pub use lifecycle::{Batch, Bin, LifecycleStore, Snapshot};
pub use runtime::{Dispatcher, DispatcherHandle, SchedulerRuntime, TickReport};
pub use scheduler::{LayoutQuery, LayoutView, Scheduler};
