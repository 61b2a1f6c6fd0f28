use thiserror::Error;

/// Errors an iterator tree can surface while executing against a backend.
///
/// Wraps the backend's own error type so a `Cursor::err()` can be inspected
/// without the algebra needing to know what kind of backend it's running
/// against.
#[derive(Debug, Error)]
pub enum IterError<E> {
    #[error("backend error: {0}")]
    Backend(#[source] E),

    #[error("comparison applied to a ref of the wrong kind")]
    WrongRefKind,

    #[error("comparison type mismatch: cannot compare {lhs} to {rhs}")]
    IncompatibleComparison { lhs: &'static str, rhs: &'static str },

    #[error("Not iterator used outside of an index-mode context")]
    NotRequiresIndexContext,

    #[error("HasA cannot be probed via contains(); use it as an And's mandatory child")]
    HasARequiresScannerContext,
}
