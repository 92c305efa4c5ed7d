//! Deduplication
//!
//! Within `requested` the most recent instance of an identity wins. In the
//! other bins an instance loses to any `requested` instance of the same
//! identity, and otherwise to a later instance in its own bin. Losers are
//! always removed from their own bin; a `requested` instance is never
//! removed in favour of an in-flight one.

use std::collections::{HashMap, HashSet};

use super::working::{BatchBuilder, Item, WorkingSet};
use crate::callback::CanonicalIdentity;
use crate::lifecycle::{Bin, Reason};

/// Keep the last item of every identity in `items`, skipping identities in
/// `claimed` entirely.
fn keep_last(
    items: Vec<Item>,
    claimed: &HashSet<CanonicalIdentity>,
) -> (Vec<Item>, Vec<Item>) {
    let last: HashMap<&CanonicalIdentity, usize> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (&item.identity, index))
        .collect();
    let survivors: Vec<bool> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            !claimed.contains(&item.identity) && last.get(&item.identity) == Some(&index)
        })
        .collect();

    items
        .into_iter()
        .zip(survivors)
        .fold((Vec::new(), Vec::new()), |(mut kept, mut removed), (item, survives)| {
            if survives {
                kept.push(item);
            } else {
                removed.push(item);
            }
            (kept, removed)
        })
}

pub(super) fn dedupe(work: &mut WorkingSet, batch: &mut BatchBuilder) {
    let (requested, duplicates) = keep_last(work.take(Bin::Requested), &HashSet::new());
    for item in duplicates {
        tracing::trace!(instance = %item.instance, bin = %Bin::Requested, "duplicate");
        batch.remove(Bin::Requested, Reason::Duplicate, item.handle);
    }

    let claimed: HashSet<CanonicalIdentity> =
        requested.iter().map(|item| item.identity.clone()).collect();
    work.put(Bin::Requested, requested);

    for bin in Bin::IN_FLIGHT {
        let (kept, superseded) = keep_last(work.take(bin), &claimed);
        for item in superseded {
            tracing::trace!(instance = %item.instance, %bin, "superseded");
            batch.remove(bin, Reason::Duplicate, item.handle);
        }
        work.put(bin, kept);
    }
}
