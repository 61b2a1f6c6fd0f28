//! Cancellation and deadline plumbing threaded through every suspension
//! point named in spec.md §5 (`value_of`, `name_of`, `quad`,
//! `quad_direction`, `next`, `contains`, `apply_deltas`).

use crate::error::{CancelReason, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A cheap, cloneable signal a caller can use to abort an in-flight scan or
/// `apply_deltas` call. No async runtime is pulled in for this: suspension
/// points are synchronous backend calls, so a checked `AtomicBool` plus an
/// optional deadline is all the protocol in §5 needs.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// A token that never cancels and has no deadline.
    pub fn none() -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A token with a query-level deadline; `check` reports
    /// `DeadlineExceeded` once `Instant::now()` passes it.
    pub fn with_deadline(deadline: Instant) -> Self {
        CancellationToken {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Signal cancellation; visible to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Check this token before blocking on a suspension point; returns
    /// `Err` the instant either the explicit flag is set or the deadline has
    /// passed.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(StoreError::Cancelled(CancelReason::Requested));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StoreError::Cancelled(CancelReason::DeadlineExceeded));
            }
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        CancellationToken::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unset_token_never_cancels() {
        assert!(CancellationToken::none().check().is_ok());
    }

    #[test]
    fn cancelled_token_reports_requested() {
        let t = CancellationToken::none();
        t.cancel();
        match t.check() {
            Err(StoreError::Cancelled(CancelReason::Requested)) => {}
            other => panic!("expected Cancelled(Requested), got {other:?}"),
        }
    }

    #[test]
    fn expired_deadline_reports_deadline_exceeded() {
        let t = CancellationToken::with_deadline(Instant::now() - Duration::from_secs(1));
        match t.check() {
            Err(StoreError::Cancelled(CancelReason::DeadlineExceeded)) => {}
            other => panic!("expected Cancelled(DeadlineExceeded), got {other:?}"),
        }
    }

    #[test]
    fn clone_shares_cancellation_state() {
        let t = CancellationToken::none();
        let clone = t.clone();
        clone.cancel();
        assert!(t.is_cancelled());
    }
}
