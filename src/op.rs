use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Tag of a write operation.
///
/// `Common` is only an intermediate marker used while walking a diff
/// alignment; it never appears in a finished [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Append,
    Delete,
    Replace,
    Common,
}

/// A single edit against a byte buffer.
///
/// `offset` is the byte position in the buffer the operation targets at apply
/// time; operations produced by [`crate::diff::diff`] are positioned against
/// the evolving buffer, so applying them in emission order reproduces the new
/// content exactly.
///
/// `data` holds the inserted bytes for Append/Replace and the removed bytes
/// for Delete (kept so a delete can be inspected after the fact). For
/// Append/Replace, `size == data.len()` always; for Delete, a rebase may
/// shrink `size` below `data.len()` when part of the target range was already
/// removed by a concurrent operation.
///
/// `base_hash` is the CRC32 of the file state the operation was computed
/// against. It is zero until the operation is submitted or committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub offset: u64,
    pub size: u64,
    pub data: Vec<u8>,
    pub base_hash: u32,
}

impl Operation {
    fn new(kind: OpKind, offset: u64, data: Vec<u8>) -> Self {
        Self {
            kind,
            offset,
            size: data.len() as u64,
            data,
            base_hash: 0,
        }
    }

    /// Insert `data` at `offset`.
    pub fn append(offset: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpKind::Append, offset, data.into())
    }

    /// Remove the bytes `data` found at `offset`.
    pub fn delete(offset: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpKind::Delete, offset, data.into())
    }

    /// Overwrite the bytes at `offset` with `data` (same length, in place).
    pub fn replace(offset: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(OpKind::Replace, offset, data.into())
    }

    pub fn with_base_hash(mut self, hash: u32) -> Self {
        self.base_hash = hash;
        self
    }

    /// One past the last byte affected.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// True for the degenerate zero-length delete a rebase produces when a
    /// Replace collided with a concurrent Delete. Such a marker is applied as
    /// a no-op; callers that want to reject or re-request the write instead
    /// can check for it after reconciliation.
    pub fn is_collision_marker(&self) -> bool {
        self.kind == OpKind::Delete && self.offset == 0 && self.size == 0 && self.data.is_empty()
    }

    /// Check the construction invariants on an operation that arrived from
    /// the wire rather than from one of the constructors.
    pub fn validate(&self) -> Result<(), SyncError> {
        match self.kind {
            OpKind::Common => {
                return Err(SyncError::InvalidOperation(
                    "Common is an intermediate diff tag, not a finished operation".into(),
                ));
            }
            OpKind::Append | OpKind::Replace => {
                if self.size != self.data.len() as u64 {
                    return Err(SyncError::InvalidOperation(format!(
                        "size {} does not match data length {}",
                        self.size,
                        self.data.len()
                    )));
                }
            }
            OpKind::Delete => {
                if self.size > self.data.len() as u64 && !self.data.is_empty() {
                    return Err(SyncError::InvalidOperation(format!(
                        "delete size {} exceeds recorded data length {}",
                        self.size,
                        self.data.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_size_from_data() {
        let op = Operation::append(3, b"abc".to_vec());
        assert_eq!(op.size, 3);
        assert_eq!(op.end(), 6);
        assert_eq!(op.base_hash, 0);

        let op = Operation::delete(0, b"xy".to_vec()).with_base_hash(7);
        assert_eq!(op.size, 2);
        assert_eq!(op.base_hash, 7);
    }

    #[test]
    fn test_validate_rejects_size_mismatch() {
        let mut op = Operation::replace(0, b"abcd".to_vec());
        assert!(op.validate().is_ok());
        op.size = 2;
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_common() {
        let op = Operation {
            kind: OpKind::Common,
            offset: 0,
            size: 0,
            data: vec![],
            base_hash: 0,
        };
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_collision_marker() {
        let marker = Operation::delete(0, Vec::new());
        assert!(marker.is_collision_marker());
        assert!(!Operation::delete(0, b"a".to_vec()).is_collision_marker());
    }
}
