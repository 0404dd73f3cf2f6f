use thiserror::Error;

/// Errors surfaced by the consistency core.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The client's base state has scrolled out of the bounded history
    /// window; it must re-read the full file and restart from a fresh diff.
    #[error("base state for {path} is older than the history window; full resynchronization required")]
    NeedsResync { path: String },

    /// An operation violated a construction invariant.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// I/O error from an injected read/hash callback or the apply path,
    /// propagated unchanged. Retry policy belongs to the caller.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
