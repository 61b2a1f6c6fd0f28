//! Facade crate: re-exports every quadcore component crate under one name,
//! and defines the trait seams SPEC_FULL.md's "External interfaces (§6)"
//! section names for collaborators this workspace doesn't implement —
//! bulk loaders/quad-file parsers (`QuadReader`/`QuadWriter`) and CDC/side-
//! index maintainers (`LogReader`).
//!
//! Grounded in the teacher's top-level workspace shape: `gonnect-uk-
//! hypermind-examples` has no single facade crate, but its `sdk` crate
//! plays an analogous re-export role for its own consumers (`pub use
//! rdf_model::{...}`, `pub use storage::QuadStore`) — this crate is that
//! pattern applied at the workspace level instead of the SDK level, since
//! here the façade's job is to hand downstream front-ends (query
//! languages, HTTP, REPL, CLI — all out of scope) a single dependency and
//! a narrow, documented seam rather than an ergonomic builder API.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(missing_docs)]

pub use qc_cost as cost;
pub use qc_iter as iter;
pub use qc_model as model;
pub use qc_optimizer as optimizer;
pub use qc_store as store;
pub use qc_writer as writer;

pub use qc_model::{Direction, Quad, Ref, Value};
pub use qc_store::{LogEntry, LogId, Store, StoreError, StoreResult};
pub use qc_writer::{TransactionBuffer, Writer};

/// A pull source of quads (spec.md §6): the seam bulk loaders and quad-file
/// parsers are specified against. No concrete N-Quads/JSON-LD reader lives
/// in this workspace — parsers/serializers are an explicit Non-goal — this
/// trait and `VecQuadReader` are the contract and test double external
/// readers are expected to satisfy.
pub trait QuadReader {
    /// The next quad from the source, or `None` when exhausted.
    fn read_quad(&mut self) -> StoreResult<Option<Quad<Value>>>;
}

/// A push sink for quads (spec.md §6): what a bulk loader writes into,
/// typically a `Writer::add_quad_set` adapter. `write_quads` returns the
/// number of quads actually accepted (a loader may choose `ignore_dup`
/// semantics and so accept fewer than `batch.len()`).
pub trait QuadWriter {
    /// Write a batch of quads, returning how many were kept.
    fn write_quads(&mut self, batch: &[Quad<Value>]) -> StoreResult<usize>;
}

/// Change-log polling (spec.md §4 and §6): consumed by external CDC/side-
/// index maintainers that want to replay committed deltas without holding a
/// write lock. Implemented against the reference store's own log collection
/// (`MemoryReferenceStore::poll_log`/`RocksReferenceStore::poll_log`).
pub trait LogReader {
    /// Log entries with `id > after`, oldest first, capped at `limit`.
    fn poll(&self, after: LogId, limit: usize) -> StoreResult<Vec<LogEntry>>;
}

impl LogReader for qc_store::MemoryReferenceStore {
    fn poll(&self, after: LogId, limit: usize) -> StoreResult<Vec<LogEntry>> {
        Ok(self.poll_log(after, limit))
    }
}

#[cfg(feature = "rocksdb-backend")]
impl LogReader for qc_store::RocksReferenceStore {
    fn poll(&self, after: LogId, limit: usize) -> StoreResult<Vec<LogEntry>> {
        self.poll_log(after, limit)
    }
}

/// An in-memory `Vec<Quad>` test double for `QuadReader`/`QuadWriter`, used
/// by this crate's own tests and available to downstream test suites that
/// want a source/sink with no backend behind it.
#[derive(Default)]
pub struct VecQuadChannel {
    quads: std::collections::VecDeque<Quad<Value>>,
}

impl VecQuadChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quads(quads: impl IntoIterator<Item = Quad<Value>>) -> Self {
        VecQuadChannel { quads: quads.into_iter().collect() }
    }

    pub fn into_inner(self) -> Vec<Quad<Value>> {
        self.quads.into_iter().collect()
    }
}

impl QuadReader for VecQuadChannel {
    fn read_quad(&mut self) -> StoreResult<Option<Quad<Value>>> {
        Ok(self.quads.pop_front())
    }
}

impl QuadWriter for VecQuadChannel {
    fn write_quads(&mut self, batch: &[Quad<Value>]) -> StoreResult<usize> {
        self.quads.extend(batch.iter().cloned());
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_store::{CancellationToken, IgnoreOpts, MemoryReferenceStore, Options};

    fn iri(s: &str) -> Value {
        Value::iri(s).unwrap()
    }

    fn quad(s: &str, p: &str, o: &str) -> Quad<Value> {
        Quad::new(iri(s), iri(p), iri(o), None)
    }

    #[test]
    fn vec_quad_channel_round_trips() {
        let mut channel = VecQuadChannel::new();
        let written = channel.write_quads(&[quad("a", "follows", "b"), quad("c", "follows", "d")]).unwrap();
        assert_eq!(written, 2);

        let mut read = Vec::new();
        while let Some(q) = channel.read_quad().unwrap() {
            read.push(q);
        }
        assert_eq!(read.len(), 2);
    }

    #[test]
    fn log_reader_polls_committed_entries() {
        let backing = MemoryReferenceStore::new(&Options::new());
        let cancel = CancellationToken::none();
        let writer = Writer::new(&backing);
        writer.add_quad(quad("a", "follows", "b"), &cancel).unwrap();
        writer.add_quad(quad("c", "follows", "d"), &cancel).unwrap();

        let first_page = LogReader::poll(&backing, LogId(0), 10).unwrap();
        assert_eq!(first_page.len(), 2);

        let empty_tail = LogReader::poll(&backing, first_page.last().unwrap().id, 10).unwrap();
        assert!(empty_tail.is_empty());

        let _ = IgnoreOpts::strict();
    }
}
