use crate::error::SyncError;
use crate::op::{OpKind, Operation};

/// Apply an ordered operation list to `base`, producing the new content.
///
/// Operations are applied against the evolving buffer in emission order, so
/// a script from [`crate::diff::diff`] reproduces the new buffer exactly.
pub fn apply_ops(base: &[u8], ops: &[Operation]) -> Result<Vec<u8>, SyncError> {
    let mut buf = base.to_vec();
    for op in ops {
        apply_one(&mut buf, op)?;
    }
    Ok(buf)
}

/// Apply a single operation in place, bounds-checked.
///
/// A range that falls outside the buffer means the operation was not rebased
/// against the state it is being applied to; failing here is preferable to
/// corrupting the buffer.
pub fn apply_one(buf: &mut Vec<u8>, op: &Operation) -> Result<(), SyncError> {
    let offset = op.offset as usize;
    let size = op.size as usize;
    match op.kind {
        OpKind::Append => {
            if offset > buf.len() {
                return Err(out_of_bounds(op, buf.len()));
            }
            buf.splice(offset..offset, op.data.iter().copied());
        }
        OpKind::Delete => {
            let end = offset.checked_add(size).ok_or_else(|| out_of_bounds(op, buf.len()))?;
            if end > buf.len() {
                return Err(out_of_bounds(op, buf.len()));
            }
            buf.drain(offset..end);
        }
        OpKind::Replace => {
            let end = offset.checked_add(size).ok_or_else(|| out_of_bounds(op, buf.len()))?;
            if end > buf.len() {
                return Err(out_of_bounds(op, buf.len()));
            }
            buf[offset..end].copy_from_slice(&op.data[..size]);
        }
        OpKind::Common => {
            return Err(SyncError::InvalidOperation(
                "Common is an intermediate diff tag, not a finished operation".into(),
            ));
        }
    }
    Ok(())
}

fn out_of_bounds(op: &Operation, len: usize) -> SyncError {
    SyncError::InvalidOperation(format!(
        "{:?} range [{}, {}) exceeds buffer length {}",
        op.kind,
        op.offset,
        op.end(),
        len
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_append() {
        let mut buf = b"abce".to_vec();
        apply_one(&mut buf, &Operation::append(2, b"123".to_vec())).unwrap();
        assert_eq!(buf, b"ab123ce");
    }

    #[test]
    fn test_apply_delete() {
        let mut buf = b"abcdefg".to_vec();
        apply_one(&mut buf, &Operation::delete(2, b"cde".to_vec())).unwrap();
        assert_eq!(buf, b"abfg");
    }

    #[test]
    fn test_apply_replace_in_place() {
        let mut buf = b"hello world".to_vec();
        apply_one(&mut buf, &Operation::replace(6, b"earth".to_vec())).unwrap();
        assert_eq!(buf, b"hello earth");
    }

    #[test]
    fn test_apply_collision_marker_is_noop() {
        let mut buf = b"content".to_vec();
        apply_one(&mut buf, &Operation::delete(0, Vec::new())).unwrap();
        assert_eq!(buf, b"content");
    }

    #[test]
    fn test_out_of_bounds_delete_rejected() {
        let mut buf = b"short".to_vec();
        let err = apply_one(&mut buf, &Operation::delete(3, b"xyz".to_vec()));
        assert!(matches!(err, Err(SyncError::InvalidOperation(_))));
        assert_eq!(buf, b"short");
    }

    #[test]
    fn test_append_past_end_rejected() {
        let mut buf = b"ab".to_vec();
        let err = apply_one(&mut buf, &Operation::append(5, b"x".to_vec()));
        assert!(matches!(err, Err(SyncError::InvalidOperation(_))));
    }
}
