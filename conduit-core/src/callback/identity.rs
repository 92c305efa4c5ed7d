//! Canonical Identity
//!
//! Two live instances with the same canonical identity would do the same
//! work, so at most one of them may survive a tick. The identity is the
//! definition id plus the values bound to the definition's wildcard keys.
//! Given a path index, those two things fully determine every concrete
//! input, state and output address the instance resolves to.
//!
//! Bindings on an instance for keys the definition never reads are ignored,
//! and predecessors, trigger props and execution groups never contribute.

use std::fmt;

use super::definition::{CallbackDefinition, CallbackId};
use super::instance::CallbackInstance;
use crate::error::IdentityError;
use crate::layout::Bindings;

/// Dedupe key for callback instances.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalIdentity {
    callback: CallbackId,
    bindings: Bindings,
}

impl CanonicalIdentity {
    /// Derive the identity of `instance`, an instance of `definition`.
    ///
    /// Fails when a wildcard key the definition depends on is unbound.
    pub fn derive(
        definition: &CallbackDefinition,
        instance: &CallbackInstance,
    ) -> Result<Self, IdentityError> {
        let mut bindings = Bindings::new();
        for key in definition.bound_keys() {
            let value = instance.bindings().get(key).ok_or_else(|| {
                IdentityError::UnboundWildcard {
                    callback: definition.id().clone(),
                    key: key.to_string(),
                }
            })?;
            bindings.insert(key.to_string(), value.clone());
        }
        Ok(Self {
            callback: definition.id().clone(),
            bindings,
        })
    }

    /// The definition id.
    pub fn callback(&self) -> &CallbackId {
        &self.callback
    }
}

impl fmt::Display for CanonicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.callback)?;
        for (key, value) in &self.bindings {
            write!(f, ",{}={:?}", key, value)?;
        }
        Ok(())
    }
}
