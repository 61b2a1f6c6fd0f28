//! Error types for the SDK.

use thiserror::Error;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the SDK façade. A thin wrapper over `qc_store::StoreError`
/// rather than a parallel taxonomy, since this crate adds no new failure modes
/// of its own.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying store rejected or failed an operation.
    #[error("store error: {0}")]
    Store(#[from] qc_store::StoreError),
}
