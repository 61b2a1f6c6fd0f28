//! The narrow read-path contract the iterator algebra needs from a backend.
//!
//! A full store contract (including writes, `apply_deltas`, and lifecycle
//! methods) lives one layer up in `qc-store`'s `Store` trait, which requires
//! this trait as a supertrait. Keeping the split here means the algebra in
//! this crate can be executed, tested, and reasoned about against a fake
//! backend with no dependency on any concrete storage engine.

use crate::stats::SizeEstimate;
use qc_model::{Direction, Quad, Ref};

/// A single cursor over a backend-produced sequence of `Ref`s, e.g. "every
/// quad with this subject" or "every distinct node". Implementations are
/// free to be lazy; callers drive them purely through `next`/`contains`.
pub trait BackendCursor<E> {
    /// Advance and return the next ref, or `None` when exhausted.
    fn next(&mut self) -> Result<Option<Ref>, E>;

    /// Index-mode probe: is `candidate` a member of this cursor's sequence?
    /// Implementations that can answer this without a full scan (e.g. a
    /// backend-native secondary index lookup) should do so; the default
    /// here is a full linear scan and is only a correctness fallback.
    fn contains(&mut self, candidate: &Ref) -> Result<bool, E> {
        while let Some(r) = self.next()? {
            if &r == candidate {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// A size estimate for what remains in this cursor, used by `Stats`.
    fn size_hint(&self) -> SizeEstimate;
}

/// The read-only subset of the store contract that the iterator algebra
/// touches while executing a `Shape`.
pub trait Backend {
    type Error: std::error::Error + Send + Sync + 'static;
    type Cursor: BackendCursor<Self::Error>;

    /// Resolve a node ref to its value.
    fn value_of(&self, r: &Ref) -> Result<qc_model::Value, Self::Error>;

    /// Resolve a value to the node ref that denotes it, if the store has
    /// ever seen it. Used by `Shape::Lookup` to turn caller-supplied values
    /// into refs before iteration begins.
    fn ref_for_value(&self, v: &qc_model::Value) -> Result<Option<Ref>, Self::Error>;

    /// Resolve a quad ref to the quad it denotes, each position as a `Ref`.
    fn quad(&self, r: &Ref) -> Result<Quad<Ref>, Self::Error>;

    /// The node ref occupying `direction` of the quad `r` denotes.
    fn quad_direction(&self, r: &Ref, direction: Direction) -> Result<Option<Ref>, Self::Error>;

    /// Every quad ref that has `value` in `direction`.
    fn quad_iterator(&self, direction: Direction, value: &Ref) -> Self::Cursor;

    /// Every distinct node ref in the store.
    fn nodes_all_iterator(&self) -> Self::Cursor;

    /// Every quad ref in the store.
    fn quads_all_iterator(&self) -> Self::Cursor;
}
