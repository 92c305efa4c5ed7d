//! Layout Addressing
//!
//! Everything the scheduler knows about the rendered tree goes through this
//! module: component ids, property addresses, the wildcard patterns that
//! callbacks declare over them, and the path index that says which
//! components currently exist.
//!
//! The tree itself (rendering, diffing, prop values) lives elsewhere. The
//! path index is rebuilt or patched by the host whenever the tree changes
//! and is treated as an immutable snapshot for the duration of a tick.

mod address;
mod paths;
mod pattern;

pub use address::{Address, Bindings, ComponentId, FloatKey, KeyValue};
pub use paths::{PathIndex, PathSegment, TreePath};
pub use pattern::{DependencySpec, IdPattern, Selector};
