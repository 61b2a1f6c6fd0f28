//! The flat error enum surfaced at the `Store` boundary (spec.md §6/§7).

use thiserror::Error;

/// Why a suspending operation was aborted before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's `CancellationToken` was signalled explicitly.
    Requested,
    /// A query-level deadline passed before the operation could complete.
    DeadlineExceeded,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "requested"),
            CancelReason::DeadlineExceeded => write!(f, "deadline_exceeded"),
        }
    }
}

/// Every error kind a `Store` implementation can surface, across the three
/// layers spec.md §7 distinguishes: contract violations, backend errors, and
/// fatal invariants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An `Add` delta targeted a quad that is already live and
    /// `ignore_opts.ignore_dup` was not set.
    #[error("quad already exists")]
    QuadExists,

    /// A `Delete` delta targeted a quad that is not live and
    /// `ignore_opts.ignore_missing` was not set.
    #[error("quad does not exist")]
    QuadNotExist,

    /// `remove_node` was asked to delete a value no live quad references.
    #[error("node does not exist")]
    NodeNotExists,

    /// The store was used before `init`/`new` completed successfully.
    #[error("store is not initialized")]
    NotInitialized,

    /// An operation that requires persistence (e.g. `upgrade`) was called on
    /// a backend whose `is_persistent() == false`.
    #[error("backend is not persistent")]
    NotPersistent,

    /// The on-disk format version does not match what this build expects.
    #[error("version mismatch: store is at {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    /// A write was attempted against a store opened read-only.
    #[error("store is read-only")]
    ReadOnly,

    /// A delta batch contained an action other than `Add`/`Delete`.
    #[error("invalid operation: {0}")]
    Invalid(String),

    /// A suspending operation was aborted by a `CancellationToken` or a
    /// query-level deadline.
    #[error("operation cancelled: {0}")]
    Cancelled(CancelReason),

    /// An underlying driver/I-O error, opaque to the core.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// The underlying driver error a concrete backend wraps into
/// [`StoreError::Backend`]. Kept as its own type (rather than
/// `Box<dyn Error>`) so backends can match on `kind` when deciding whether a
/// failure is retryable.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        BackendError { kind, message: message.into() }
    }

    /// Whether the caller's `apply_deltas` retry loop should attempt this
    /// operation again (spec.md §7 layer 2: "retryable conflicts MAY be
    /// retried ... but convergence guarantees mean retries are usually
    /// unnecessary").
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, BackendErrorKind::TransactionConflict)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Io,
    Serialization,
    TransactionConflict,
    Corruption,
    Other,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendErrorKind::Io => "io",
            BackendErrorKind::Serialization => "serialization",
            BackendErrorKind::TransactionConflict => "transaction_conflict",
            BackendErrorKind::Corruption => "corruption",
            BackendErrorKind::Other => "backend",
        };
        f.write_str(s)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
