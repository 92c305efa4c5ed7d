//! Layout drift
//!
//! Every live instance's outputs are re-resolved against the current path
//! index. An instance whose outputs vanished is removed. An instance whose
//! outputs resolve differently is replaced, in its own bin, by a copy bound
//! to the new outputs; replacements go to the back of the bin.

use super::query::LayoutQuery;
use super::working::{BatchBuilder, Item, WorkingSet};
use crate::lifecycle::{Bin, Reason};

pub(super) fn prune<Q>(query: &Q, work: &mut WorkingSet, batch: &mut BatchBuilder)
where
    Q: LayoutQuery + ?Sized,
{
    for bin in Bin::ALL {
        let items = work.take(bin);
        let mut kept = Vec::with_capacity(items.len());
        let mut rebound = Vec::new();

        for item in items {
            let resolved = query.resolve_outputs(&item.instance);
            if resolved.is_empty() {
                tracing::trace!(instance = %item.instance, %bin, "outputs gone");
                batch.remove(bin, Reason::Pruned, item.handle);
            } else if resolved.as_slice() != item.instance.outputs() {
                tracing::trace!(instance = %item.instance, %bin, outputs = resolved.len(), "rebound");
                batch.remove(bin, Reason::Rebound, item.handle);
                let instance = query.rebound(&item.instance, resolved);
                let handle = batch.add(bin, Reason::Rebound, instance.clone());
                rebound.push(Item {
                    handle,
                    instance,
                    identity: item.identity,
                });
            } else {
                kept.push(item);
            }
        }

        kept.extend(rebound);
        work.put(bin, kept);
    }
}
