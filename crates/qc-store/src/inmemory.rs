//! The in-memory reference backend: `DashMap`-backed node/quad/log
//! collections plus the secondary indexes from spec.md §4.2, with no
//! persistence across process restarts (`is_persistent() == false`).

use crate::cancel::CancellationToken;
use crate::delta::{classify, Classified, Delta, DeltaAction, IgnoreOpts, SUB_BATCH_SIZE};
use crate::error::StoreError;
use crate::indexes::{PairIndex, SingleIndex};
use crate::observability::{track_operation, OperationType};
use crate::options::Options;
use crate::records::{quad_identity_hash, LogAction, LogEntry, LogId, Metadata, NodeRecord, QuadRecord};
use crate::registry::BackendFactory;
use crate::store_trait::{ErasedCursor, Store, StoreStats};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use qc_cost::SizeEstimate;
use qc_iter::{Backend, BackendCursor};
use qc_model::{Direction, Hash128, Quad, Ref, Value};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A point-in-time snapshot cursor: the set of refs is fixed at
/// `quad_iterator`/`nodes_all_iterator`/`quads_all_iterator` call time
/// (spec.md §4.2 "Scan semantics"), so `next` needs no further backend
/// access.
pub enum MemoryCursor {
    Nodes(std::vec::IntoIter<Hash128>),
    Quads(std::vec::IntoIter<Hash128>),
}

impl BackendCursor<StoreError> for MemoryCursor {
    fn next(&mut self) -> Result<Option<Ref>, StoreError> {
        Ok(match self {
            MemoryCursor::Nodes(it) => it.next().map(Ref::node),
            MemoryCursor::Quads(it) => it.next().map(Ref::quad),
        })
    }

    fn size_hint(&self) -> SizeEstimate {
        let remaining = match self {
            MemoryCursor::Nodes(it) => it.len(),
            MemoryCursor::Quads(it) => it.len(),
        };
        SizeEstimate::exact(remaining as u64)
    }
}

struct Kept {
    action: DeltaAction,
    hashes: Quad<Hash128>,
    id: Hash128,
    value_quad: Quad<Value>,
}

/// The in-memory reference `Store`. Keeps every record in a `DashMap` for
/// lock-free concurrent reads and fine-grained write locking, mirroring the
/// teacher's `InMemoryBackend`.
pub struct MemoryReferenceStore {
    nodes: DashMap<Hash128, NodeRecord>,
    quads: DashMap<Hash128, QuadRecord>,
    log: RwLock<Vec<LogEntry>>,
    next_log_id: AtomicU64,
    metadata: RwLock<Metadata>,
    single_index: DashMap<[u8; 17], Vec<Hash128>>,
    pair_index: DashMap<[u8; 33], Vec<Hash128>>,
    max_retries: u32,
}

impl MemoryReferenceStore {
    pub fn new(options: &Options) -> Self {
        let max_retries = options.get("max_retries").and_then(|v| v.as_i64()).unwrap_or(3).max(0) as u32;
        MemoryReferenceStore {
            nodes: DashMap::new(),
            quads: DashMap::new(),
            log: RwLock::new(Vec::new()),
            next_log_id: AtomicU64::new(1),
            metadata: RwLock::new(Metadata::default()),
            single_index: DashMap::new(),
            pair_index: DashMap::new(),
            max_retries,
        }
    }

    /// Change-log consumer interface (spec.md §6): every entry with
    /// `id > after`, oldest first, capped at `limit`.
    pub fn poll_log(&self, after: LogId, limit: usize) -> Vec<LogEntry> {
        self.log.read().iter().filter(|e| e.id.0 > after.0).take(limit).cloned().collect()
    }

    fn index_quad(&self, id: Hash128, hashes: &Quad<Hash128>) {
        let populated: Vec<(Direction, Hash128)> = hashes.iter().map(|(d, h)| (d, *h)).collect();
        for &(d, h) in &populated {
            if let Some(single) = SingleIndex::of(d) {
                self.single_index.entry(single.key(h)).or_insert_with(Vec::new).push(id);
            }
        }
        for i in 0..populated.len() {
            for j in (i + 1)..populated.len() {
                let (d1, h1) = populated[i];
                let (d2, h2) = populated[j];
                if let Some(pair) = PairIndex::for_directions(d1, d2) {
                    self.pair_index.entry(pair.key(h1, h2)).or_insert_with(Vec::new).push(id);
                }
            }
        }
    }

    /// Retry a backend-touching closure on a retryable transaction
    /// conflict, with a small jittered backoff (spec.md §7 layer 2). The
    /// in-memory backend has no real transactions so this never actually
    /// retries; it exists so the persistent backend can share call sites.
    fn retrying<T>(&self, mut f: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut attempt = 0;
        loop {
            match f() {
                Ok(v) => return Ok(v),
                Err(StoreError::Backend(e)) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let jitter_ms = rand::random::<u8>() as u64 % 10;
                    std::thread::sleep(std::time::Duration::from_millis(jitter_ms));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn to_log_action(action: DeltaAction) -> LogAction {
    match action {
        DeltaAction::Add => LogAction::Add,
        DeltaAction::Delete => LogAction::Delete,
    }
}

fn now_nanos() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos()
}

fn hash_quad(q: &Quad<Value>) -> Quad<Hash128> {
    q.map(|v| v.content_hash().0)
}

impl Backend for MemoryReferenceStore {
    type Error = StoreError;
    type Cursor = ErasedCursor;

    fn value_of(&self, r: &Ref) -> Result<Value, StoreError> {
        if let Ok(v) = r.prefetched_value() {
            return Ok(v.clone());
        }
        self.nodes
            .get(&r.hash())
            .map(|rec| rec.value.clone())
            .ok_or_else(|| StoreError::Invalid(format!("unresolved node ref {}", r.hash())))
    }

    fn ref_for_value(&self, v: &Value) -> Result<Option<Ref>, StoreError> {
        let hash = v.content_hash().0;
        Ok(self
            .nodes
            .get(&hash)
            .filter(|rec| rec.is_live())
            .map(|rec| Ref::node_with_value(hash, rec.value.clone())))
    }

    fn quad(&self, r: &Ref) -> Result<Quad<Ref>, StoreError> {
        let rec = self
            .quads
            .get(&r.hash())
            .ok_or_else(|| StoreError::Invalid(format!("unresolved quad ref {}", r.hash())))?;
        Ok(Quad::new(
            Ref::node(rec.subject),
            Ref::node(rec.predicate),
            Ref::node(rec.object),
            if rec.label.is_nil() { None } else { Some(Ref::node(rec.label)) },
        ))
    }

    fn quad_direction(&self, r: &Ref, direction: Direction) -> Result<Option<Ref>, StoreError> {
        let rec = self
            .quads
            .get(&r.hash())
            .ok_or_else(|| StoreError::Invalid(format!("unresolved quad ref {}", r.hash())))?;
        Ok(rec.hash_at(direction).map(Ref::node))
    }

    fn quad_iterator(&self, direction: Direction, value: &Ref) -> ErasedCursor {
        let ids = SingleIndex::of(direction)
            .map(|single| single.key(value.hash()))
            .and_then(|key| self.single_index.get(&key).map(|v| v.clone()))
            .unwrap_or_default()
            .into_iter()
            .filter(|id| self.quads.get(id).map(|r| r.is_live()).unwrap_or(false))
            .collect::<Vec<_>>();
        ErasedCursor::new(MemoryCursor::Quads(ids.into_iter()))
    }

    fn nodes_all_iterator(&self) -> ErasedCursor {
        let ids: Vec<Hash128> = self.nodes.iter().filter(|e| e.is_live()).map(|e| *e.key()).collect();
        ErasedCursor::new(MemoryCursor::Nodes(ids.into_iter()))
    }

    fn quads_all_iterator(&self) -> ErasedCursor {
        let ids: Vec<Hash128> = self.quads.iter().filter(|e| e.is_live()).map(|e| *e.key()).collect();
        ErasedCursor::new(MemoryCursor::Quads(ids.into_iter()))
    }
}

impl Store for MemoryReferenceStore {
    fn value_of(&self, value: &Value) -> Ref {
        Ref::node_with_value(value.content_hash().0, value.clone())
    }

    fn name_of(&self, r: &Ref, cancel: &CancellationToken) -> Result<Option<Value>, StoreError> {
        cancel.check()?;
        Ok(self.nodes.get(&r.hash()).filter(|rec| rec.is_live()).map(|rec| rec.value.clone()))
    }

    fn quad(&self, r: &Ref, cancel: &CancellationToken) -> Result<Option<Quad<Value>>, StoreError> {
        cancel.check()?;
        let Some(rec) = self.quads.get(&r.hash()).filter(|rec| rec.is_live()) else {
            return Ok(None);
        };
        let resolve = |h: Hash128| -> Result<Value, StoreError> {
            self.nodes
                .get(&h)
                .map(|n| n.value.clone())
                .ok_or_else(|| StoreError::Invalid(format!("node record missing for live quad position {h}")))
        };
        Ok(Some(Quad::new(
            resolve(rec.subject)?,
            resolve(rec.predicate)?,
            resolve(rec.object)?,
            if rec.label.is_nil() { None } else { Some(resolve(rec.label)?) },
        )))
    }

    fn stats(&self, _exact: bool) -> Result<StoreStats, StoreError> {
        let meta = *self.metadata.read();
        Ok(StoreStats { node_count: meta.node_count, quad_count: meta.quad_count, exact: true })
    }

    fn apply_deltas(
        &self,
        deltas: &[Delta],
        ignore_opts: IgnoreOpts,
        cancel: &CancellationToken,
    ) -> Result<crate::delta::ApplyReport, StoreError> {
        track_operation(OperationType::ApplyDeltas, || {
            cancel.check()?;

            // Step 1: existence classification.
            let mut kept = Vec::with_capacity(deltas.len());
            let mut dropped = 0usize;
            for d in deltas {
                let hashes = hash_quad(&d.quad);
                let id = quad_identity_hash(&hashes);
                let live = self.quads.get(&id).map(|rec| rec.is_live()).unwrap_or(false);
                match classify(d.action, live, ignore_opts)? {
                    Classified::Keep(action) => kept.push(Kept { action, hashes, id, value_quad: d.quad.clone() }),
                    Classified::Drop => dropped += 1,
                }
            }
            if kept.is_empty() {
                return Ok(crate::delta::ApplyReport { kept: 0, dropped });
            }
            cancel.check()?;

            // Step 2: log append, single batch.
            let log_ids: Vec<LogId> = {
                let mut log = self.log.write();
                kept.iter()
                    .map(|k| {
                        let id = LogId(self.next_log_id.fetch_add(1, Ordering::SeqCst));
                        log.push(LogEntry { id, action: to_log_action(k.action), key: k.id, timestamp_nanos: now_nanos() });
                        id
                    })
                    .collect()
            };

            // Step 3: quad record upsert, in sub-batches of SUB_BATCH_SIZE.
            let entries: Vec<(usize, LogId)> = (0..kept.len()).zip(log_ids.iter().copied()).collect();
            for chunk in entries.chunks(SUB_BATCH_SIZE) {
                self.retrying(|| {
                    for &(i, log_id) in chunk {
                        let k = &kept[i];
                        match self.quads.entry(k.id) {
                            Entry::Occupied(mut e) => match k.action {
                                DeltaAction::Add => e.get_mut().added.push(log_id),
                                DeltaAction::Delete => e.get_mut().deleted.push(log_id),
                            },
                            Entry::Vacant(v) => {
                                let mut rec = QuadRecord::new(k.hashes.clone());
                                match k.action {
                                    DeltaAction::Add => rec.added.push(log_id),
                                    DeltaAction::Delete => rec.deleted.push(log_id),
                                }
                                self.index_quad(k.id, &k.hashes);
                                v.insert(rec);
                            }
                        }
                    }
                    Ok(())
                })?;
            }

            // Step 4: node ref-count update, in sub-batches of SUB_BATCH_SIZE.
            let mut node_deltas: FxHashMap<Hash128, i64> = FxHashMap::default();
            let mut node_values: FxHashMap<Hash128, Value> = FxHashMap::default();
            for k in &kept {
                let sign: i64 = match k.action {
                    DeltaAction::Add => 1,
                    DeltaAction::Delete => -1,
                };
                for ((_, h), (_, v)) in k.hashes.iter().zip(k.value_quad.iter()) {
                    *node_deltas.entry(*h).or_insert(0) += sign;
                    node_values.entry(*h).or_insert_with(|| v.clone());
                }
            }
            let node_items: Vec<(Hash128, i64)> = node_deltas.into_iter().collect();
            let mut node_count_delta: i64 = 0;
            for chunk in node_items.chunks(SUB_BATCH_SIZE) {
                let chunk_delta = self.retrying(|| {
                    let mut delta_here = 0i64;
                    for &(hash, delta) in chunk {
                        match self.nodes.entry(hash) {
                            Entry::Occupied(mut e) => {
                                let before = e.get().size;
                                let after = before + delta;
                                e.get_mut().size = after;
                                if before <= 0 && after > 0 {
                                    delta_here += 1;
                                } else if before > 0 && after <= 0 {
                                    delta_here -= 1;
                                }
                            }
                            Entry::Vacant(v) => {
                                let value = node_values
                                    .get(&hash)
                                    .cloned()
                                    .expect("node_values populated for every hash touched by node_deltas");
                                v.insert(NodeRecord { id: hash, value, size: delta });
                                if delta > 0 {
                                    delta_here += 1;
                                }
                            }
                        }
                    }
                    Ok::<i64, StoreError>(delta_here)
                })?;
                node_count_delta += chunk_delta;
            }

            // Step 5: metadata update, single transaction.
            {
                let mut meta = self.metadata.write();
                let adds = kept.iter().filter(|k| k.action == DeltaAction::Add).count() as i64;
                let deletes = kept.len() as i64 - adds;
                meta.quad_count = (meta.quad_count as i64 + adds - deletes).max(0) as u64;
                meta.node_count = (meta.node_count as i64 + node_count_delta).max(0) as u64;
            }

            Ok(crate::delta::ApplyReport { kept: kept.len(), dropped })
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Registers the in-memory backend under the name `"memory"`.
pub struct MemoryBackendFactory;

impl BackendFactory for MemoryBackendFactory {
    fn init(&self, _address: &str, _options: &Options) -> Result<(), StoreError> {
        Ok(())
    }

    fn open(&self, _address: &str, options: &Options) -> Result<Box<dyn Store>, StoreError> {
        Ok(Box::new(MemoryReferenceStore::new(options)))
    }

    fn upgrade(&self, _address: &str, _options: &Options) -> Result<(), StoreError> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::Delta;
    use qc_iter::Shape;

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
    fn round_trip_quad_and_node_counts() {
        let s = store();
        let deltas = vec![
            Delta::add(quad("a", "follows", "b")),
            Delta::add(quad("c", "follows", "b")),
            Delta::add(quad("c", "follows", "d")),
        ];
        let cancel = CancellationToken::none();
        let report = s.apply_deltas(&deltas, IgnoreOpts::strict(), &cancel).unwrap();
        assert_eq!(report.kept, 3);
        let stats = s.stats(true).unwrap();
        assert_eq!(stats.quad_count, 3);
        assert_eq!(stats.node_count, 5); // a, follows, b, c, d
    }

    #[test]
    fn delete_then_readd_converges() {
        let s = store();
        let cancel = CancellationToken::none();
        s.apply_deltas(&[Delta::add(quad("a", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        s.apply_deltas(&[Delta::delete(quad("a", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        assert_eq!(s.stats(true).unwrap().quad_count, 0);
        s.apply_deltas(&[Delta::add(quad("a", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        assert_eq!(s.stats(true).unwrap().quad_count, 1);
    }

    #[test]
    fn direction_scan_finds_only_live_quads() {
        let s = store();
        let cancel = CancellationToken::none();
        s.apply_deltas(
            &[Delta::add(quad("a", "follows", "b")), Delta::add(quad("c", "follows", "b"))],
            IgnoreOpts::strict(),
            &cancel,
        )
        .unwrap();
        let b = Store::value_of(&s, &iri("b"));
        let shape = Shape::links_to(Shape::Fixed(vec![b]), Direction::Object);
        let mut cursor = qc_iter::Cursor::build(&s, &shape).unwrap();
        let mut count = 0;
        while cursor.next() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn adding_duplicate_rejected_by_default() {
        let s = store();
        let cancel = CancellationToken::none();
        s.apply_deltas(&[Delta::add(quad("a", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        let err = s.apply_deltas(&[Delta::add(quad("a", "follows", "b"))], IgnoreOpts::strict(), &cancel);
        assert!(matches!(err, Err(StoreError::QuadExists)));
    }

    #[test]
    fn label_absent_creates_no_nil_node() {
        let s = store();
        let cancel = CancellationToken::none();
        s.apply_deltas(&[Delta::add(quad("a", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        assert!(s.nodes.get(&Hash128::NIL).is_none());
    }

    #[test]
    fn remove_node_sweep_surfaces_all_references() {
        let s = store();
        let cancel = CancellationToken::none();
        s.apply_deltas(
            &[Delta::add(quad("a", "follows", "b")), Delta::add(quad("b", "follows", "c"))],
            IgnoreOpts::strict(),
            &cancel,
        )
        .unwrap();
        let b = Store::value_of(&s, &iri("b"));
        let as_subject = qc_iter::Shape::links_to(qc_iter::Shape::Fixed(vec![b.clone()]), Direction::Subject);
        let as_object = qc_iter::Shape::links_to(qc_iter::Shape::Fixed(vec![b]), Direction::Object);
        let mut found = 0;
        for shape in [as_subject, as_object] {
            let mut cursor = qc_iter::Cursor::build(&s, &shape).unwrap();
            while cursor.next() {
                found += 1;
            }
        }
        assert_eq!(found, 2);
    }

    fn seed_graph(s: &MemoryReferenceStore, cancel: &CancellationToken) {
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
        let mut deltas: Vec<Delta> = follows.iter().map(|(s, o)| Delta::add(quad(s, "follows", o))).collect();
        deltas.extend(["b", "d", "g"].iter().map(|s| {
            Delta::add(Quad::new(iri(s), iri("status"), iri("cool"), Some(iri("status_graph"))))
        }));
        s.apply_deltas(&deltas, IgnoreOpts::strict(), cancel).unwrap();
    }

    #[test]
    fn seed_scenario_1_round_trip() {
        let s = store();
        let cancel = CancellationToken::none();
        seed_graph(&s, &cancel);
        let stats = s.stats(true).unwrap();
        assert_eq!(stats.quad_count, 11);
        assert_eq!(stats.node_count, 11); // a,b,c,d,e,f,g,follows,status,cool,status_graph
    }

    #[test]
    fn seed_scenario_2_direction_scan() {
        let s = store();
        let cancel = CancellationToken::none();
        seed_graph(&s, &cancel);
        let c = Store::value_of(&s, &iri("c"));
        let mut cursor = s.quad_iterator(Direction::Subject, &c);
        let mut seen = Vec::new();
        while let Some(found) = cursor.next().unwrap() {
            let q = Store::quad(&s, &found, &cancel).unwrap().unwrap();
            seen.push((q.object.clone(),));
        }
        seen.sort_by_key(|(o,)| o.canonical_bytes());
        assert_eq!(seen, vec![(iri("b"),), (iri("d"),)]);
    }

    #[test]
    fn seed_scenario_4_delete_and_readd_convergence() {
        let s = store();
        let cancel = CancellationToken::none();
        seed_graph(&s, &cancel);
        s.apply_deltas(&[Delta::delete(quad("c", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        assert_eq!(s.stats(true).unwrap().quad_count, 10);

        let c_node = s.nodes.get(&Store::value_of(&s, &iri("c")).hash()).unwrap();
        assert_eq!(c_node.size, 3);

        let b_node = s.nodes.get(&Store::value_of(&s, &iri("b")).hash()).unwrap();
        assert_eq!(b_node.size, 3);

        s.apply_deltas(&[Delta::add(quad("c", "follows", "b"))], IgnoreOpts::strict(), &cancel).unwrap();
        let stats = s.stats(true).unwrap();
        assert_eq!(stats.quad_count, 11);
        assert_eq!(stats.node_count, 11);
    }

    #[test]
    fn seed_scenario_5_transaction_rejects_missing_delete() {
        let s = store();
        let cancel = CancellationToken::none();
        seed_graph(&s, &cancel);
        let before = s.stats(true).unwrap();

        let deltas = vec![
            Delta::add(quad("x", "follows", "y")),
            Delta::delete(quad("non", "existent", "quad")),
        ];
        let err = s.apply_deltas(&deltas, IgnoreOpts::strict(), &cancel);
        assert!(matches!(err, Err(StoreError::QuadNotExist)));
        assert_eq!(s.stats(true).unwrap(), before);
    }
}
