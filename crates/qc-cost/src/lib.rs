//! Relative cost constants and size-estimation arithmetic shared by the
//! iterator algebra's [`Stats`]-like structs and the optimizer's rewrites.
//!
//! Nothing in this crate touches a backend. Costs here are *relative units*,
//! not wall-clock predictions: what matters is that the optimizer can
//! compare two candidate plans and pick the cheaper one, not that the
//! numbers mean anything absolute.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use std::fmt;

/// The relative cost, in arbitrary units, of touching the backend once to
/// advance a scanner-mode iterator by one result.
pub const NEXT_BACKEND_TOUCH: f64 = 1.0;

/// The relative cost of a single index-mode `contains` probe against the
/// backend. Index probes are normally cheaper than a full scan step because
/// they hit a point index rather than walking a cursor.
pub const CONTAINS_BACKEND_TOUCH: f64 = 0.5;

/// The relative cost of comparing one in-memory value, e.g. inside a
/// [`crate`]-level `Comparison` operator evaluating its predicate.
pub const COMPARISON_PER_ITEM: f64 = 0.05;

/// The relative cost of a single hash-map lookup, e.g. a `Fixed` operator
/// checking whether a candidate is one of its members.
pub const HASH_LOOKUP: f64 = 0.1;

/// The relative fixed overhead of opening any iterator, independent of how
/// many results it produces. Keeps the optimizer from treating two
/// zero-result plans as exactly tied.
pub const FIXED_OPEN_OVERHEAD: f64 = 0.01;

/// An estimate of how many results an iterator will produce.
///
/// `exact` distinguishes a backend-reported exact count (e.g. from a
/// `Fixed` set or a materialized index) from a statistical guess (e.g. the
/// result of intersecting two estimates); the optimizer and callers of
/// `Store::stats` use this to decide how much to trust a size when choosing
/// between plans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeEstimate {
    pub value: u64,
    pub exact: bool,
}

impl SizeEstimate {
    pub fn exact(value: u64) -> Self {
        SizeEstimate { value, exact: true }
    }

    pub fn estimated(value: u64) -> Self {
        SizeEstimate { value, exact: false }
    }

    /// Size estimate for the intersection of two iterators: bounded above by
    /// the smaller side, and never exact unless both inputs were exact AND
    /// one is a subset check the caller already knows to hold (callers that
    /// know more, e.g. `Fixed` against an exact index, should construct an
    /// exact estimate directly instead of calling this).
    pub fn intersect(self, other: SizeEstimate) -> SizeEstimate {
        SizeEstimate {
            value: self.value.min(other.value),
            exact: false,
        }
    }

    /// Size estimate for the union of two iterators: at most the sum, exact
    /// only if both inputs were exact and known disjoint (same caveat as
    /// [`SizeEstimate::intersect`]).
    pub fn union(self, other: SizeEstimate) -> SizeEstimate {
        SizeEstimate {
            value: self.value.saturating_add(other.value),
            exact: false,
        }
    }

    /// Size estimate after applying a selective filter with the given
    /// estimated selectivity in `[0.0, 1.0]`.
    pub fn scale(self, selectivity: f64) -> SizeEstimate {
        let selectivity = selectivity.clamp(0.0, 1.0);
        SizeEstimate {
            value: (self.value as f64 * selectivity).round() as u64,
            exact: false,
        }
    }

    pub fn capped(self, limit: u64) -> SizeEstimate {
        if self.value <= limit {
            self
        } else {
            SizeEstimate {
                value: limit,
                exact: false,
            }
        }
    }
}

impl fmt::Display for SizeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exact {
            write!(f, "{}", self.value)
        } else {
            write!(f, "~{}", self.value)
        }
    }
}

/// How selective a single bound direction is assumed to be when no backend
/// statistics are available, used by [`select_index_order`] and by
/// optimizer rewrites that need a rough prior.
///
/// Mirrors the intuition that predicate position is usually the least
/// selective direction in a typical graph (a handful of predicates, many
/// subjects and objects) and label the most selective (few graphs).
pub fn default_selectivity(direction: Direction) -> f64 {
    match direction {
        Direction::Subject => 0.15,
        Direction::Predicate => 0.4,
        Direction::Object => 0.2,
        Direction::Label => 0.05,
        Direction::Any => 1.0,
    }
}

/// Re-exported so this crate doesn't need a dependency on `qc-model` just
/// for a four-plus-wildcard enum; kept structurally identical and is
/// expected to be used interchangeably via `From`/`Into` at call sites that
/// do depend on `qc-model`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Subject,
    Predicate,
    Object,
    Label,
    Any,
}

/// Pick the cheapest-looking ordering among a set of bound directions, given
/// only the naive selectivity priors in [`default_selectivity`]. Lower
/// product of selectivities first, ties broken by the fixed direction order.
pub fn select_index_order(bound: &[Direction]) -> Vec<Direction> {
    let mut bound: Vec<Direction> = bound.to_vec();
    bound.sort_by(|a, b| {
        default_selectivity(*a)
            .partial_cmp(&default_selectivity(*b))
            .unwrap()
            .then_with(|| (*a as u8).cmp(&(*b as u8)))
    });
    bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_is_bounded_by_smaller_side() {
        let a = SizeEstimate::exact(100);
        let b = SizeEstimate::exact(10);
        assert_eq!(a.intersect(b).value, 10);
        assert!(!a.intersect(b).exact);
    }

    #[test]
    fn union_sums_and_saturates() {
        let a = SizeEstimate::exact(u64::MAX - 1);
        let b = SizeEstimate::exact(10);
        assert_eq!(a.union(b).value, u64::MAX);
    }

    #[test]
    fn scale_clamps_selectivity() {
        let a = SizeEstimate::exact(100);
        assert_eq!(a.scale(2.0).value, 100);
        assert_eq!(a.scale(-1.0).value, 0);
    }

    #[test]
    fn select_index_order_prefers_label_then_subject() {
        let order = select_index_order(&[Direction::Predicate, Direction::Label, Direction::Subject]);
        assert_eq!(order, vec![Direction::Label, Direction::Subject, Direction::Predicate]);
    }

    #[test]
    fn capped_limits_without_exceeding() {
        let a = SizeEstimate::exact(1000);
        assert_eq!(a.capped(10).value, 10);
        assert_eq!(SizeEstimate::exact(5).capped(10).value, 5);
    }
}
