//! High-level GraphDb API: a `Writer` plus its backing `Store`, with a
//! handful of ergonomic methods over the façade operations `qc-writer`
//! already exposes.

use crate::Result;
use qc_model::{Quad, Value};
use qc_store::{CancellationToken, MemoryReferenceStore, Options, Store};
use qc_writer::Writer;

/// High-level interface to a quad store: owns an in-memory
/// `MemoryReferenceStore` and drives it through a `Writer`.
///
/// Grounded in the teacher's `GraphDB` (owns the store, exposes `insert`/
/// `count`/`is_empty`) — reduced to the writer façade's actual surface,
/// with `query()`/SPARQL dropped since query languages are out of scope.
pub struct GraphDb {
    store: MemoryReferenceStore,
}

impl GraphDb {
    /// Create a new in-memory graph database.
    ///
    /// # Example
    ///
    /// ```
    /// use qc_sdk::GraphDb;
    ///
    /// let db = GraphDb::in_memory();
    /// assert!(db.is_empty());
    /// ```
    pub fn in_memory() -> Self {
        GraphDb { store: MemoryReferenceStore::new(&Options::new()) }
    }

    /// A `Writer` over this database's store, for the full add/remove/
    /// sweep/transaction surface.
    pub fn writer(&self) -> Writer<'_> {
        Writer::new(&self.store)
    }

    /// Insert a single quad.
    pub fn insert(&self, quad: Quad<Value>) -> Result<()> {
        self.writer().add_quad(quad, &CancellationToken::none())?;
        Ok(())
    }

    /// Insert every quad in `quads`.
    pub fn insert_all(&self, quads: impl IntoIterator<Item = Quad<Value>>) -> Result<()> {
        self.writer().add_quad_set(quads, &CancellationToken::none())?;
        Ok(())
    }

    /// Remove every live quad that mentions `value` in any direction.
    pub fn remove_node(&self, value: &Value) -> Result<()> {
        self.writer().remove_node(value, &CancellationToken::none())?;
        Ok(())
    }

    /// The total number of live quads in the database.
    pub fn count(&self) -> u64 {
        self.store.stats(true).map(|s| s.quad_count).unwrap_or(0)
    }

    /// Whether the database holds no live quads.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl Default for GraphDb {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Value {
        Value::iri(s).unwrap()
    }

    fn quad(s: &str, p: &str, o: &str) -> Quad<Value> {
        Quad::new(iri(s), iri(p), iri(o), None)
    }

    #[test]
    fn create_in_memory_starts_empty() {
        let db = GraphDb::in_memory();
        assert_eq!(db.count(), 0);
        assert!(db.is_empty());
    }

    #[test]
    fn insert_all_then_remove_node() {
        let db = GraphDb::default();
        db.insert_all([quad("alice", "knows", "bob"), quad("bob", "knows", "alice")]).unwrap();
        assert_eq!(db.count(), 2);

        db.remove_node(&iri("bob")).unwrap();
        assert!(db.is_empty());
    }
}
