use std::collections::VecDeque;

use crate::op::Operation;

/// How far behind a client may lag before it must resynchronize in full.
pub const HISTORY_CAPACITY: usize = 20;

/// An accepted write operation tagged with the CRC32 of the file content
/// after it was applied. That hash is the checkpoint key: a client whose
/// shadow copy was synchronized at this state names it by this hash.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub operation: Operation,
    pub base_hash: u32,
}

/// Newest-first bounded log of accepted write operations for one file.
///
/// Eviction silently drops information: once a checkpoint scrolls out of the
/// window, clients based on it can no longer be rebased and must re-read the
/// file.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert an accepted operation at the newest end, evicting the oldest
    /// entry once the window is full.
    pub fn record(&mut self, operation: Operation, base_hash: u32) {
        self.entries.push_front(HistoryEntry {
            operation,
            base_hash,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Post-apply hash of the newest entry: the authoritative current
    /// content state, since every accepted write is recorded here.
    pub fn newest_hash(&self) -> Option<u32> {
        self.entries.front().map(|e| e.base_hash)
    }

    /// Position of the entry whose post-apply hash is `hash`, if it is still
    /// inside the window. Position 0 is the newest entry.
    pub fn find_checkpoint(&self, hash: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.base_hash == hash)
    }

    /// Entries committed after the checkpoint at `position`, oldest first.
    /// This is the order the rebase engine must transform against.
    pub fn entries_since(&self, position: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().take(position).rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
