//! The writer façade (spec.md §4.5) and the transaction buffer it shares
//! with `apply_transaction` (spec.md §4.6).
//!
//! Grounded in the teacher's `sdk::graphdb::GraphDB` + `sdk::update_builder
//! ::UpdateBuilder` (a thin, method-chaining wrapper over `QuadStore::
//! insert`): `Writer` plays the same role here, generalized from a single
//! `insert()` builder to the full add/remove/sweep/transaction surface the
//! spec names. The teacher's own `sdk::transaction::Transaction` is an
//! unimplemented placeholder (`Err(Error::InvalidOperation("not yet
//! implemented"))`); `TransactionBuffer::drain` plus `Writer::
//! apply_transaction` is the real implementation that placeholder stood in
//! for.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(missing_docs)] // relaxed below module-by-module as they stabilize

mod transaction;

pub use transaction::TransactionBuffer;

use qc_iter::{Backend, BackendCursor};
use qc_model::{Direction, Quad, Ref, Value};
use qc_store::{ApplyReport, CancellationToken, Delta, IgnoreOpts, Store, StoreError, StoreResult, SUB_BATCH_SIZE};
use std::collections::HashSet;

/// A thin façade over any [`Store`]: maps each spec.md §4.5 operation onto
/// `apply_deltas` with the writer's configured `ignore_opts` (default:
/// reject duplicate adds, reject missing deletes).
///
/// Held as `&dyn Store` rather than generic over a concrete backend type, so
/// one `Writer` works uniformly whether it was opened through
/// `qc_store::Registry` (which only ever hands back `Box<dyn Store>`) or a
/// concrete in-memory/RocksDB store directly. The sweep in [`Writer::
/// remove_node`] is written against [`qc_iter::Backend`]/[`BackendCursor`]
/// directly rather than `qc_iter::Cursor` for this reason: `Cursor<'b, B:
/// Backend>` requires `B: Sized`, which a `dyn Store` is not.
///
/// `Store::value_of`/`Store::quad` share a name with `Backend::value_of`/
/// `Backend::quad` (same method, opposite argument direction for
/// `value_of`; different arity for `quad`) — both traits are in scope here,
/// so every call to either is written out fully-qualified rather than via
/// dot syntax, which would be ambiguous.
pub struct Writer<'s> {
    store: &'s dyn Store,
    ignore_opts: IgnoreOpts,
}

impl<'s> Writer<'s> {
    pub fn new(store: &'s dyn Store) -> Self {
        Writer { store, ignore_opts: IgnoreOpts::strict() }
    }

    pub fn with_ignore_opts(store: &'s dyn Store, ignore_opts: IgnoreOpts) -> Self {
        Writer { store, ignore_opts }
    }

    pub fn add_quad(&self, quad: Quad<Value>, cancel: &CancellationToken) -> StoreResult<ApplyReport> {
        self.store.apply_deltas(&[Delta::add(quad)], self.ignore_opts, cancel)
    }

    pub fn add_quad_set(
        &self,
        quads: impl IntoIterator<Item = Quad<Value>>,
        cancel: &CancellationToken,
    ) -> StoreResult<ApplyReport> {
        let deltas: Vec<Delta> = quads.into_iter().map(Delta::add).collect();
        self.store.apply_deltas(&deltas, self.ignore_opts, cancel)
    }

    pub fn remove_quad(&self, quad: Quad<Value>, cancel: &CancellationToken) -> StoreResult<ApplyReport> {
        self.store.apply_deltas(&[Delta::delete(quad)], self.ignore_opts, cancel)
    }

    /// A sweep (spec.md §4.5): resolve `value` to a `Ref`, scan all four
    /// directions for live quads mentioning it, and delete every one found,
    /// flushing in `SUB_BATCH_SIZE`-sized batches. `NodeNotExists` if no live
    /// quad references `value`.
    pub fn remove_node(&self, value: &Value, cancel: &CancellationToken) -> StoreResult<ApplyReport> {
        let node_ref = Store::value_of(self.store, value);

        let mut matching: HashSet<Ref> = HashSet::new();
        for direction in Direction::ALL {
            let mut cursor = self.store.quad_iterator(direction, &node_ref);
            while let Some(found) = cursor.next()? {
                matching.insert(found);
                cancel.check()?;
            }
        }

        if matching.is_empty() {
            return Err(StoreError::NodeNotExists);
        }

        let mut deltas = Vec::with_capacity(matching.len());
        for quad_ref in matching {
            if let Some(q) = Store::quad(self.store, &quad_ref, cancel)? {
                deltas.push(Delta::delete(q));
            }
        }

        // Lenient on the flush: a concurrent writer may have already removed
        // one of these quads between the scan above and this batch landing.
        let mut report = ApplyReport::default();
        for chunk in deltas.chunks(SUB_BATCH_SIZE) {
            let chunk_report = self.store.apply_deltas(chunk, IgnoreOpts::lenient(), cancel)?;
            report.kept += chunk_report.kept;
            report.dropped += chunk_report.dropped;
        }
        Ok(report)
    }

    /// Atomically apply every delta staged in `buffer` and drain it.
    pub fn apply_transaction(&self, buffer: &mut TransactionBuffer, cancel: &CancellationToken) -> StoreResult<ApplyReport> {
        let deltas = buffer.drain();
        self.store.apply_deltas(&deltas, self.ignore_opts, cancel)
    }

    pub fn close(&self) -> StoreResult<()> {
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_store::{MemoryBackendFactory, MemoryReferenceStore, Options};

    fn store() -> MemoryReferenceStore {
        MemoryReferenceStore::new(&Options::new())
    }

    fn iri(s: &str) -> Value {
        Value::iri(s).unwrap()
    }

    fn quad(s: &str, p: &str, o: &str) -> Quad<Value> {
        Quad::new(iri(s), iri(p), iri(o), None)
    }

    #[test]
    fn add_quad_set_round_trips() {
        let backing = store();
        let writer = Writer::new(&backing);
        let cancel = CancellationToken::none();
        let report = writer
            .add_quad_set([quad("a", "follows", "b"), quad("c", "follows", "b")], &cancel)
            .unwrap();
        assert_eq!(report.kept, 2);
        assert_eq!(backing.stats(true).unwrap().quad_count, 2);
    }

    #[test]
    fn remove_node_sweeps_every_direction() {
        let backing = store();
        let writer = Writer::new(&backing);
        let cancel = CancellationToken::none();
        writer
            .add_quad_set([quad("a", "follows", "b"), quad("b", "follows", "c")], &cancel)
            .unwrap();
        assert_eq!(backing.stats(true).unwrap().quad_count, 2);

        let report = writer.remove_node(&iri("b"), &cancel).unwrap();
        assert_eq!(report.kept, 2);
        assert_eq!(backing.stats(true).unwrap().quad_count, 0);
    }

    #[test]
    fn remove_node_of_unreferenced_value_errors() {
        let backing = store();
        let writer = Writer::new(&backing);
        let cancel = CancellationToken::none();
        let err = writer.remove_node(&iri("nobody-knows-me"), &cancel);
        assert!(matches!(err, Err(StoreError::NodeNotExists)));
    }

    #[test]
    fn apply_transaction_drains_buffer_atomically() {
        let backing = store();
        let writer = Writer::new(&backing);
        let cancel = CancellationToken::none();

        let mut buffer = TransactionBuffer::new();
        buffer.add(quad("a", "follows", "b"));
        buffer.add(quad("c", "follows", "d"));
        let report = writer.apply_transaction(&mut buffer, &cancel).unwrap();
        assert_eq!(report.kept, 2);
        assert!(buffer.is_empty());
        assert_eq!(backing.stats(true).unwrap().quad_count, 2);
    }

    #[test]
    fn seed_scenario_6_node_deletion_sweep() {
        let backing = store();
        let writer = Writer::new(&backing);
        let cancel = CancellationToken::none();

        let follows = [
            ("a", "b"),
            ("c", "b"),
            ("c", "d"),
            ("d", "b"),
            ("b", "f"),
            ("f", "g"),
            ("d", "g"),
            ("e", "f"),
        ];
        writer.add_quad_set(follows.iter().map(|(s, o)| quad(s, "follows", o)), &cancel).unwrap();
        writer
            .add_quad_set(
                ["b", "d", "g"]
                    .iter()
                    .map(|s| Quad::new(iri(s), iri("status"), iri("cool"), Some(iri("status_graph")))),
                &cancel,
            )
            .unwrap();
        assert_eq!(backing.stats(true).unwrap().quad_count, 11);

        // B appears in 4 quads: (a,follows,b), (c,follows,b), (d,follows,b), (b,follows,f).
        let report = writer.remove_node(&iri("b"), &cancel).unwrap();
        assert_eq!(report.kept, 4);
        assert_eq!(backing.stats(true).unwrap().quad_count, 7);

        let b_ref = Store::value_of(&backing, &iri("b"));
        for direction in Direction::ALL {
            let mut cursor = backing.quad_iterator(direction, &b_ref);
            assert!(cursor.next().unwrap().is_none());
        }

        let cool_ref = Store::value_of(&backing, &iri("cool"));
        let mut remaining = 0;
        let mut cursor = backing.quad_iterator(Direction::Object, &cool_ref);
        while cursor.next().unwrap().is_some() {
            remaining += 1;
        }
        assert_eq!(remaining, 2);
    }

    #[test]
    fn via_registry_and_trait_object() {
        let registry = qc_store::default_registry();
        registry.init("memory", "unused", &Options::new()).unwrap();
        let opened = registry.open("memory", "unused", &Options::new()).unwrap();
        let writer = Writer::new(opened.as_ref());
        let cancel = CancellationToken::none();
        writer.add_quad(quad("a", "follows", "b"), &cancel).unwrap();
        assert_eq!(opened.stats(true).unwrap().quad_count, 1);
        let _ = MemoryBackendFactory;
    }
}
