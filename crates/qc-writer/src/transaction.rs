//! The transaction buffer (spec.md §4.6): an append-only delta vector with
//! add/delete cancellation, consumed atomically by `apply_deltas`.
//!
//! Grounded in the teacher's `storage::transaction::InMemoryTransaction`
//! (buffer puts/deletes, `into_changes` drains the buffer) generalized from
//! raw key/value puts to quad-level add/delete with the spec's
//! cancel-on-opposite semantics the teacher's buffer never needed.

use qc_model::{Quad, QuadHash, Value};
use qc_store::{Delta, DeltaAction};

/// An append-only buffer of pending quad changes. Not thread-safe by design
/// (spec.md §5 "single-writer by construction"): a buffer is owned by
/// exactly one in-flight transaction.
#[derive(Default)]
pub struct TransactionBuffer {
    entries: Vec<(QuadHash, DeltaAction, Quad<Value>)>,
}

impl TransactionBuffer {
    pub fn new() -> Self {
        TransactionBuffer { entries: Vec::new() }
    }

    /// Stage an add. Cancels a pending delete of the same quad; collapses
    /// into a no-op if an add of the same quad is already pending.
    pub fn add(&mut self, quad: Quad<Value>) {
        self.stage(DeltaAction::Add, quad);
    }

    /// Stage a delete. Cancels a pending add of the same quad; collapses
    /// into a no-op if a delete of the same quad is already pending.
    pub fn delete(&mut self, quad: Quad<Value>) {
        self.stage(DeltaAction::Delete, quad);
    }

    fn stage(&mut self, action: DeltaAction, quad: Quad<Value>) {
        let hash = quad.content_hash();
        if let Some(pos) = self.entries.iter().position(|(h, _, _)| *h == hash) {
            let (_, pending_action, _) = &self.entries[pos];
            if *pending_action != action {
                self.entries.remove(pos);
            }
            // Same action already pending: repeated Add/Delete collapses to one.
        } else {
            self.entries.push((hash, action, quad));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drain the buffer into the delta batch `apply_deltas` consumes
    /// atomically, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Delta> {
        self.entries
            .drain(..)
            .map(|(_, action, quad)| match action {
                DeltaAction::Add => Delta::add(quad),
                DeltaAction::Delete => Delta::delete(quad),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(s: &str) -> Quad<Value> {
        Quad::new(
            Value::iri(s).unwrap(),
            Value::iri("http://example.org/p").unwrap(),
            Value::iri("http://example.org/o").unwrap(),
            None,
        )
    }

    #[test]
    fn add_then_delete_of_same_quad_cancels() {
        let mut buf = TransactionBuffer::new();
        buf.add(quad("a"));
        buf.delete(quad("a"));
        assert!(buf.is_empty());
    }

    #[test]
    fn delete_then_add_of_same_quad_cancels() {
        let mut buf = TransactionBuffer::new();
        buf.delete(quad("a"));
        buf.add(quad("a"));
        assert!(buf.is_empty());
    }

    #[test]
    fn repeated_add_collapses_to_one() {
        let mut buf = TransactionBuffer::new();
        buf.add(quad("a"));
        buf.add(quad("a"));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn repeated_delete_collapses_to_one() {
        let mut buf = TransactionBuffer::new();
        buf.delete(quad("a"));
        buf.delete(quad("a"));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn distinct_quads_both_kept() {
        let mut buf = TransactionBuffer::new();
        buf.add(quad("a"));
        buf.add(quad("b"));
        assert_eq!(buf.len(), 2);
        let drained = buf.drain();
        assert_eq!(drained.len(), 2);
        assert!(buf.is_empty());
    }
}
