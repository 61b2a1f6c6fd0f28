//! The `Store` contract (spec.md §4) and its reference backends.
//!
//! `qc-model` defines the data; `qc-iter` defines how it's scanned; this
//! crate defines where it lives: node/quad/log records, the apply-deltas
//! write path, secondary indexes, and the backend registry a caller opens a
//! concrete [`store_trait::Store`] through. Two backends are provided: an
//! in-memory reference implementation (always available) and an optional
//! RocksDB-backed persistent one (`rocksdb-backend` feature).

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(missing_docs)] // relaxed below module-by-module as they stabilize

pub mod cancel;
pub mod delta;
pub mod error;
pub mod inmemory;
pub mod indexes;
pub mod observability;
pub mod options;
pub mod records;
pub mod registry;
pub mod store_trait;

#[cfg(feature = "rocksdb-backend")]
pub mod rocksdb_backend;

pub use cancel::CancellationToken;
pub use delta::{ApplyReport, Delta, DeltaAction, IgnoreOpts, SUB_BATCH_SIZE};
pub use error::{BackendError, BackendErrorKind, CancelReason, StoreError, StoreResult};
pub use inmemory::{MemoryBackendFactory, MemoryCursor, MemoryReferenceStore};
pub use indexes::{value_type_index_key, PairIndex, SingleIndex};
pub use observability::{track_operation, OperationType};
pub use options::{DurabilityMode, OptionValue, Options, ReadMode};
pub use records::{LogAction, LogEntry, LogId, Metadata, NodeRecord, QuadRecord};
pub use registry::{BackendFactory, Registry};
pub use store_trait::{ErasedCursor, Store, StoreStats};

#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::{RocksBackendFactory, RocksReferenceStore};

/// Build a [`Registry`] with every backend this build was compiled with
/// already registered under its conventional name (`"memory"`, and
/// `"rocksdb"` when the `rocksdb-backend` feature is enabled).
pub fn default_registry() -> Registry {
    let registry = Registry::new();
    registry.register("memory", Box::new(MemoryBackendFactory));
    #[cfg(feature = "rocksdb-backend")]
    registry.register("rocksdb", Box::new(RocksBackendFactory));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_opens_memory() {
        let registry = default_registry();
        assert!(registry.is_registered("memory"));
        registry.init("memory", "unused", &Options::new()).unwrap();
        let store = registry.open("memory", "unused", &Options::new()).unwrap();
        let cancel = CancellationToken::none();
        assert_eq!(store.stats(true).unwrap().quad_count, 0);
        store.close().unwrap();
        drop(cancel);
    }

    #[cfg(feature = "rocksdb-backend")]
    #[test]
    fn default_registry_registers_rocksdb() {
        assert!(default_registry().is_registered("rocksdb"));
    }
}
