//! The delta vocabulary `apply_deltas` consumes (spec.md §4.2) and the
//! existence-classification step shared by every backend.

use crate::error::StoreError;
use qc_model::Quad;
use serde::{Deserialize, Serialize};

/// The sub-batch size `N` the apply-deltas protocol upserts quad and node
/// records in (spec.md §4.2 step 3/4), overridable via
/// `Options::batch_size`.
pub const SUB_BATCH_SIZE: usize = 5;

/// What a [`Delta`] asks the store to do to a quad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaAction {
    Add,
    Delete,
}

/// One intended change: add or remove a quad.
#[derive(Clone, Debug, PartialEq)]
pub struct Delta {
    pub action: DeltaAction,
    pub quad: Quad<qc_model::Value>,
}

impl Delta {
    pub fn add(quad: Quad<qc_model::Value>) -> Self {
        Delta { action: DeltaAction::Add, quad }
    }

    pub fn delete(quad: Quad<qc_model::Value>) -> Self {
        Delta { action: DeltaAction::Delete, quad }
    }
}

/// Whether `apply_deltas` should reject or silently drop deltas that
/// duplicate existing state (spec.md §4.2 step 1, §7).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IgnoreOpts {
    /// Drop `Add`s of an already-live quad instead of returning
    /// `QuadExists`.
    pub ignore_dup: bool,
    /// Drop `Delete`s of a not-live quad instead of returning
    /// `QuadNotExist`.
    pub ignore_missing: bool,
}

impl IgnoreOpts {
    /// The default policy (spec.md §4.5): reject duplicates, reject missing
    /// deletes.
    pub fn strict() -> Self {
        IgnoreOpts::default()
    }

    pub fn lenient() -> Self {
        IgnoreOpts { ignore_dup: true, ignore_missing: true }
    }
}

/// What `apply_deltas` actually did, for callers and for
/// `observability::track_operation`'s structured logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub kept: usize,
    pub dropped: usize,
}

/// One delta after existence classification: either it survives into the
/// write path (`Keep`) or it was silently dropped per `IgnoreOpts` (spec.md
/// §4.2 step 1).
pub(crate) enum Classified {
    Keep(DeltaAction),
    Drop,
}

/// Classify a single delta against whether its quad is currently live,
/// spec.md §4.2 step 1's policy table. Returns `Err` when the classification
/// itself must fail the whole batch (duplicate/missing without the matching
/// `ignore_opts` flag).
pub(crate) fn classify(action: DeltaAction, live: bool, opts: IgnoreOpts) -> Result<Classified, StoreError> {
    match (action, live) {
        (DeltaAction::Add, true) => {
            if opts.ignore_dup {
                Ok(Classified::Drop)
            } else {
                Err(StoreError::QuadExists)
            }
        }
        (DeltaAction::Add, false) => Ok(Classified::Keep(DeltaAction::Add)),
        (DeltaAction::Delete, true) => Ok(Classified::Keep(DeltaAction::Delete)),
        (DeltaAction::Delete, false) => {
            if opts.ignore_missing {
                Ok(Classified::Drop)
            } else {
                Err(StoreError::QuadNotExist)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_of_live_quad_rejected_by_default() {
        assert!(matches!(
            classify(DeltaAction::Add, true, IgnoreOpts::strict()),
            Err(StoreError::QuadExists)
        ));
    }

    #[test]
    fn add_of_live_quad_dropped_when_ignored() {
        assert!(matches!(
            classify(DeltaAction::Add, true, IgnoreOpts::lenient()),
            Ok(Classified::Drop)
        ));
    }

    #[test]
    fn delete_of_missing_quad_rejected_by_default() {
        assert!(matches!(
            classify(DeltaAction::Delete, false, IgnoreOpts::strict()),
            Err(StoreError::QuadNotExist)
        ));
    }

    #[test]
    fn delete_of_live_quad_always_kept() {
        assert!(matches!(
            classify(DeltaAction::Delete, true, IgnoreOpts::strict()),
            Ok(Classified::Keep(DeltaAction::Delete))
        ));
    }
}
