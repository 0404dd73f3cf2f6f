use std::collections::HashMap;

use tracing::warn;

/// Per-path cache of the last buffer known to be synchronized with the
/// server. It supplies the "before" side of a diff and is patched as local
/// writes are intercepted; it performs no I/O itself beyond the injected
/// read callback on first touch.
///
/// This is per-client state. A multi-threaded client wraps the store in its
/// own lock; the store itself assumes single-threaded access.
#[derive(Debug, Default)]
pub struct ShadowStore {
    copies: HashMap<String, Vec<u8>>,
}

impl ShadowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached copy for `path`, populating it from `read` if
    /// absent. `read` is the authoritative source (typically an RPC to the
    /// server); its errors propagate unchanged.
    pub fn ensure_initialized<F>(&mut self, path: &str, read: F) -> std::io::Result<&[u8]>
    where
        F: FnOnce() -> std::io::Result<Vec<u8>>,
    {
        if !self.copies.contains_key(path) {
            let content = read()?;
            self.copies.insert(path.to_string(), content);
        }
        Ok(self.copies[path].as_slice())
    }

    /// Overwrite `data.len()` bytes at `offset`, growing the buffer if the
    /// write extends past the current end. A write past end-of-cache
    /// zero-fills the gap, mirroring what a read of a sparse file returns.
    ///
    /// Patching a path with no cached entry (e.g. after `discard`) is a
    /// deliberately lenient no-op: crashing the client's write path over a
    /// stale cache entry is worse than re-reading the file on next touch.
    pub fn patch(&mut self, path: &str, data: &[u8], offset: u64) {
        let Some(copy) = self.copies.get_mut(path) else {
            warn!(path, offset, len = data.len(), "patch on uncached shadow copy, ignoring");
            return;
        };
        let offset = offset as usize;
        let end = offset + data.len();
        if end > copy.len() {
            copy.resize(end, 0);
        }
        copy[offset..end].copy_from_slice(data);
    }

    /// Resize the cached buffer to exactly `size` bytes, zero-filling on
    /// growth. No-op with a diagnostic when the path is not cached.
    pub fn truncate(&mut self, path: &str, size: u64) {
        let Some(copy) = self.copies.get_mut(path) else {
            warn!(path, size, "truncate on uncached shadow copy, ignoring");
            return;
        };
        copy.resize(size as usize, 0);
    }

    /// Drop the cached entry for `path`.
    pub fn discard(&mut self, path: &str) {
        if self.copies.remove(path).is_none() {
            warn!(path, "discard on uncached shadow copy, ignoring");
        }
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.copies.get(path).map(Vec::as_slice)
    }

    /// Sub-range of the cached copy, truncated to the available length.
    /// Empty if `offset` is past the end or the path is not cached.
    pub fn get_range(&self, path: &str, offset: u64, size: u64) -> &[u8] {
        let Some(copy) = self.copies.get(path) else {
            return &[];
        };
        let start = (offset as usize).min(copy.len());
        let end = (offset as usize).saturating_add(size as usize).min(copy.len());
        &copy[start..end]
    }
}
