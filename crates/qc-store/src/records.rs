//! The stored-record shapes from spec.md §3: node records, quad records,
//! log entries and the metadata singleton.

use qc_model::{Direction, Hash128, Quad, Value};
use serde::{Deserialize, Serialize};

/// Monotonically increasing identifier assigned to a [`LogEntry`] at
/// insertion time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogId(pub u64);

/// Per-distinct-value stored record (spec.md §3 "Node record").
///
/// `size` is a live reference count: the number of live quad *directions*
/// (subject+predicate+object+label, each counted separately) currently
/// mentioning `value`. A record with `size == 0` is logically deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Hash128,
    pub value: Value,
    pub size: i64,
}

impl NodeRecord {
    pub fn is_live(&self) -> bool {
        self.size > 0
    }
}

/// Per-distinct-quad stored record (spec.md §3 "Quad record").
///
/// Liveness is `added.len() > deleted.len()`, never a single boolean: this
/// is what lets two `apply_deltas` callers converge on the same quad
/// without one clobbering the other's write (§4.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuadRecord {
    pub id: Hash128,
    pub subject: Hash128,
    pub predicate: Hash128,
    pub object: Hash128,
    /// `Hash128::NIL` when the quad has no graph label.
    pub label: Hash128,
    pub added: Vec<LogId>,
    pub deleted: Vec<LogId>,
}

impl QuadRecord {
    pub fn new(hashes: Quad<Hash128>) -> Self {
        QuadRecord {
            id: quad_identity_hash(&hashes),
            subject: hashes.subject,
            predicate: hashes.predicate,
            object: hashes.object,
            label: hashes.label.unwrap_or(Hash128::NIL),
            added: Vec::new(),
            deleted: Vec::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.added.len() > self.deleted.len()
    }

    /// The value hash occupying `direction`, or `None` for `Label` on a
    /// record with no graph and for `Any`.
    pub fn hash_at(&self, direction: Direction) -> Option<Hash128> {
        match direction {
            Direction::Subject => Some(self.subject),
            Direction::Predicate => Some(self.predicate),
            Direction::Object => Some(self.object),
            Direction::Label if self.label.is_nil() => None,
            Direction::Label => Some(self.label),
            Direction::Any => None,
        }
    }

    pub fn directions(&self) -> impl Iterator<Item = (Direction, Hash128)> + '_ {
        Direction::ALL.into_iter().filter_map(move |d| self.hash_at(d).map(|h| (d, h)))
    }
}

/// The quad identity hash: a pure function of the four direction hashes,
/// used as the primary key of a [`QuadRecord`] before the record itself
/// exists (e.g. during existence classification in `apply_deltas`).
pub(crate) fn quad_identity_hash(hashes: &Quad<Hash128>) -> Hash128 {
    let mut bytes = Vec::with_capacity(4 * 16);
    bytes.extend_from_slice(&hashes.subject.to_be_bytes());
    bytes.extend_from_slice(&hashes.predicate.to_be_bytes());
    bytes.extend_from_slice(&hashes.object.to_be_bytes());
    bytes.extend_from_slice(&hashes.label.unwrap_or(Hash128::NIL).to_be_bytes());
    Hash128::of(&bytes)
}

/// What a [`LogEntry`] records happening to a quad.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogAction {
    Add,
    Delete,
}

/// An immutable, append-only record of one accepted delta (spec.md §3 "Log
/// entry"). Consumed by external change-data-capture readers; the core
/// itself never replays it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogId,
    pub action: LogAction,
    pub key: Hash128,
    /// Wall-clock nanoseconds since the Unix epoch.
    pub timestamp_nanos: u128,
}

/// The store-wide aggregate counters (spec.md §3 "Metadata singleton"),
/// updated atomically with every successful `apply_deltas` batch.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub node_count: u64,
    pub quad_count: u64,
}
