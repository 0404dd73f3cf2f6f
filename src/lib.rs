//! Consistency core for a collaborative network filesystem.
//!
//! Multiple remote clients mount and edit the same directory tree; each
//! computes edits against a possibly-stale view of a file. This crate keeps
//! concurrently-edited files consistent:
//!
//! - [`diff::diff`] turns a full buffer replacement into a minimal list of
//!   byte-range [`Operation`]s, and [`patch::apply_ops`] is its inverse
//! - [`hash`] is the CRC32 content fingerprint both sides checkpoint on
//! - [`ShadowStore`] caches the last-synchronized copy a client diffs against
//! - [`History`] is the bounded window of accepted operations
//! - [`ot::transform`] and [`Reconciler`] rebase a pending edit over
//!   everything committed since its base state, per path, under one lock
//!
//! Transport, RPC dispatch, and real file I/O live in the surrounding
//! request-handling layers; this crate is handed byte buffers, injected
//! read/hash callbacks, and opaque path keys.

pub mod diff;
pub mod diff_mode;
pub mod error;
pub mod hash;
pub mod history;
pub mod op;
pub mod ot;
pub mod patch;
pub mod script;
pub mod shadow;

pub use diff_mode::DiffMode;
pub use error::SyncError;
pub use history::{History, HistoryEntry, HISTORY_CAPACITY};
pub use op::{OpKind, Operation};
pub use ot::Reconciler;
pub use script::EditScript;
pub use shadow::ShadowStore;
