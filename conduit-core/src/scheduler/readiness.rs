//! Readiness
//!
//! A requested instance is ready when nothing it reads is written by a
//! pending instance. Reads are its resolved inputs and state minus its own
//! outputs, so an instance never blocks itself. Only direct writers count;
//! the check is not transitive.

use std::collections::HashSet;

use super::query::LayoutQuery;
use super::working::Item;
use crate::callback::CallbackInstance;
use crate::layout::Address;

/// Whether `instance` reads none of `blocking`.
pub(super) fn is_ready<Q>(query: &Q, instance: &CallbackInstance, blocking: &HashSet<Address>) -> bool
where
    Q: LayoutQuery + ?Sized,
{
    let own: HashSet<&Address> = instance.outputs().iter().collect();
    let inputs = query.resolve_inputs(instance);
    let state = query.resolve_state(instance);

    inputs
        .iter()
        .chain(&state)
        .filter(|address| !own.contains(address))
        .all(|address| !blocking.contains(address))
}

/// Indices of the ready items among `candidates`, in order.
pub(super) fn ready<Q>(query: &Q, candidates: &[Item], blocking: &HashSet<Address>) -> Vec<usize>
where
    Q: LayoutQuery + ?Sized,
{
    candidates
        .iter()
        .enumerate()
        .filter(|(_, item)| is_ready(query, &item.instance, blocking))
        .map(|(index, _)| index)
        .collect()
}
