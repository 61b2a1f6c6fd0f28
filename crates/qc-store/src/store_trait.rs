//! The `Store` contract (spec.md §4.1): the operations every backend must
//! expose and that the core depends on exclusively through this trait.

use crate::cancel::CancellationToken;
use crate::delta::{ApplyReport, Delta, IgnoreOpts};
use crate::error::{StoreError, StoreResult};
use qc_cost::SizeEstimate;
use qc_iter::{Backend, BackendCursor};
use qc_model::{Quad, Ref, Value};

/// Node/quad counters, possibly approximate (spec.md §4.1 `stats`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreStats {
    pub node_count: u64,
    pub quad_count: u64,
    /// Whether the counts above are exact or a cached/estimated snapshot.
    pub exact: bool,
}

/// A type-erased [`BackendCursor`], boxed so every backend's `Store` shares
/// one concrete `Backend::Cursor` type. Without this, `Box<dyn Store>` could
/// not name a single `Cursor` associated type across backends with
/// different cursor implementations (e.g. the in-memory and RocksDB
/// backends).
pub struct ErasedCursor(Box<dyn BackendCursor<StoreError> + Send>);

impl ErasedCursor {
    pub fn new(inner: impl BackendCursor<StoreError> + Send + 'static) -> Self {
        ErasedCursor(Box::new(inner))
    }
}

impl BackendCursor<StoreError> for ErasedCursor {
    fn next(&mut self) -> Result<Option<Ref>, StoreError> {
        self.0.next()
    }

    fn contains(&mut self, candidate: &Ref) -> Result<bool, StoreError> {
        self.0.contains(candidate)
    }

    fn size_hint(&self) -> SizeEstimate {
        self.0.size_hint()
    }
}

/// The operations a backend exposes to the core, plus the
/// [`qc_iter::Backend`] trait every iterator executes against. A `Store` is
/// always also a `Backend`, since `quad_iterator`/`nodes_all_iterator`/
/// `quads_all_iterator` live there (spec.md §4.1/§4.3). Fixing `Error` and
/// `Cursor` here (rather than leaving them free on `Backend`) is what makes
/// `Box<dyn Store>` nameable in the backend registry.
pub trait Store: Backend<Error = StoreError, Cursor = ErasedCursor> {
    /// Deterministic, never fails: returns a `Ref` for `value` whether or
    /// not it is stored. A `Ref` for an unstored value compares unequal to
    /// any `Ref` that resolves to a stored record.
    fn value_of(&self, value: &Value) -> Ref;

    /// The denotation of `r`, or `None` if it does not resolve to a live
    /// record.
    fn name_of(&self, r: &Ref, cancel: &CancellationToken) -> StoreResult<Option<Value>>;

    /// Materialize a quad `Ref` into its four `Value`s.
    fn quad(&self, r: &Ref, cancel: &CancellationToken) -> StoreResult<Option<Quad<Value>>>;

    /// Current aggregate counters; `exact = false` permits a cached or
    /// estimated answer.
    fn stats(&self, exact: bool) -> StoreResult<StoreStats>;

    /// The atomic write primitive (spec.md §4.2): classify each delta
    /// against current liveness, append to the log, upsert quad and node
    /// records in sub-batches, and update the metadata singleton.
    fn apply_deltas(&self, deltas: &[Delta], ignore_opts: IgnoreOpts, cancel: &CancellationToken) -> StoreResult<ApplyReport>;

    /// Release any resources (connections, file handles) this store holds.
    /// Idempotent.
    fn close(&self) -> StoreResult<()>;
}
