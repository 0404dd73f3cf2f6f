use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::history::History;
use crate::op::{OpKind, Operation};

/// Rewrite `pending` so it remains correct after `bef` has already been
/// applied, assuming `pending` was computed against a state that did not
/// include `bef`.
///
/// The rule table is keyed by `(bef.kind, pending.kind)`:
/// - a prior Replace never shifts anything (it is same-length, in place;
///   producers must guarantee that, or results are undefined);
/// - a prior Append shifts everything at or after its insertion point;
/// - a prior Delete shifts, clamps, or shrinks depending on how the pending
///   range relates to the removed range. A Replace whose target bytes were
///   concurrently deleted cannot be applied safely and collapses to the
///   degenerate drop marker (see [`Operation::is_collision_marker`]).
pub fn transform(pending: &mut Operation, bef: &Operation) {
    // A collapsed replace stays collapsed: letting a later operation shift
    // the marker's offset would turn it back into an applicable delete.
    if pending.is_collision_marker() {
        return;
    }
    match bef.kind {
        // Same-length in-place substitution shifts no offsets.
        OpKind::Replace | OpKind::Common => {}
        OpKind::Append => {
            if pending.offset >= bef.offset {
                pending.offset += bef.size;
            }
        }
        OpKind::Delete => match pending.kind {
            OpKind::Append => {
                if pending.offset >= bef.end() {
                    pending.offset -= bef.size;
                } else if pending.offset >= bef.offset {
                    // Insertion point fell inside the removed range; it
                    // collapses to the deletion point.
                    pending.offset = bef.offset;
                }
            }
            OpKind::Delete => {
                let overlap = overlap(pending, bef);
                if overlap > 0 {
                    pending.size -= overlap;
                    if pending.offset >= bef.offset {
                        pending.offset = bef.offset;
                    }
                } else if pending.offset >= bef.offset {
                    pending.offset = pending.offset.saturating_sub(bef.size);
                }
            }
            OpKind::Replace => {
                if overlap(pending, bef) > 0 {
                    warn!(
                        offset = pending.offset,
                        size = pending.size,
                        "replace target was concurrently deleted, collapsing to drop marker"
                    );
                    let base_hash = pending.base_hash;
                    *pending = Operation::delete(0, Vec::new()).with_base_hash(base_hash);
                } else if pending.offset >= bef.offset {
                    pending.offset = pending.offset.saturating_sub(bef.size);
                }
            }
            OpKind::Common => {}
        },
    }
}

/// Length of the intersection of the two operations' byte ranges.
fn overlap(a: &Operation, b: &Operation) -> u64 {
    let start = a.offset.max(b.offset);
    let end = a.end().min(b.end());
    end.saturating_sub(start)
}

/// Server-side entry point guarding the compare → rebase → apply → record
/// sequence with one mutex per path.
///
/// Worker threads handling different connections may call [`commit`] for the
/// same file concurrently; the per-path lock makes each commit atomic with
/// respect to the others. The current content state is taken from the newest
/// history entry once inside the lock, so a hash snapshot the caller took
/// before entering cannot mask a commit that raced it. The caller's hash is
/// only needed to bootstrap an empty history, keeping file I/O outside the
/// lock.
///
/// [`commit`]: Reconciler::commit
#[derive(Debug, Default)]
pub struct Reconciler {
    paths: Mutex<HashMap<String, Arc<Mutex<History>>>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    fn path_history(&self, path: &str) -> Arc<Mutex<History>> {
        self.paths
            .lock()
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(History::new())))
            .clone()
    }

    /// Reconcile `ops` against everything committed since their base state,
    /// then apply and record them.
    ///
    /// `current_hash` is the CRC32 of the file's current authoritative
    /// content as the caller last observed it. It is only trusted when the
    /// history for `path` is empty (first write): once writes have flowed
    /// through here, the newest recorded post-apply hash is authoritative,
    /// since the caller's snapshot may predate a commit that raced it to the
    /// lock. If the authoritative hash matches the operations' base hash
    /// there is no divergence and the operations apply unchanged. Otherwise
    /// the base hash is looked up in the history window and every entry
    /// committed after that checkpoint is transformed into the pending
    /// operations, in commit order.
    ///
    /// Every operation is validated before anything is applied; a malformed
    /// batch is rejected whole.
    ///
    /// `apply` performs the authoritative write for one operation and
    /// returns the CRC32 of the file content after it; each applied
    /// operation is recorded with that hash. Collision markers produced by
    /// the rebase are neither applied nor recorded, but are left in `ops`
    /// for the caller to inspect.
    ///
    /// Returns [`SyncError::NeedsResync`] when the base state has scrolled
    /// out of the history window; the caller must have the client drop its
    /// diff state for the path and restart from a full read. Silently
    /// applying an un-rebased operation would corrupt the file for every
    /// other collaborator.
    pub fn commit<A>(
        &self,
        path: &str,
        ops: &mut Vec<Operation>,
        current_hash: u32,
        mut apply: A,
    ) -> Result<(), SyncError>
    where
        A: FnMut(&Operation) -> std::io::Result<u32>,
    {
        let Some(base_hash) = ops.first().map(|op| op.base_hash) else {
            return Ok(());
        };
        for op in ops.iter() {
            op.validate()?;
        }

        let state = self.path_history(path);
        let mut history = state.lock();

        let current_hash = history.newest_hash().unwrap_or(current_hash);

        if base_hash != current_hash {
            let Some(checkpoint) = history.find_checkpoint(base_hash) else {
                return Err(SyncError::NeedsResync {
                    path: path.to_string(),
                });
            };
            for entry in history.entries_since(checkpoint) {
                for op in ops.iter_mut() {
                    transform(op, &entry.operation);
                }
            }
            debug!(path, ops = ops.len(), "rebased pending operations");
        }

        for op in ops.iter() {
            if op.is_collision_marker() {
                warn!(path, "dropping replace that collided with a concurrent delete");
                continue;
            }
            let post_hash = apply(op)?;
            history.record(op.clone(), post_hash);
        }
        Ok(())
    }
}
