//! # qc-sdk: a worked example of the writer façade's consumer surface
//!
//! This crate is not the database — it's a small ergonomic wrapper
//! ([`GraphDb`]) showing what a downstream front-end (a query language, an
//! HTTP server, a REPL, a CLI — all out of scope for this workspace) builds
//! against: `qc_store::Store` for reads/stats and `qc_writer::Writer` for
//! every mutation.
//!
//! ## Quick start
//!
//! ```rust
//! use qc_sdk::GraphDb;
//! use qc_model::{Quad, Value};
//!
//! let db = GraphDb::in_memory();
//!
//! db.insert(Quad::new(
//!     Value::iri("http://example.org/alice").unwrap(),
//!     Value::iri("http://xmlns.com/foaf/0.1/knows").unwrap(),
//!     Value::iri("http://example.org/bob").unwrap(),
//!     None,
//! )).unwrap();
//!
//! assert_eq!(db.count(), 1);
//! ```

#![warn(missing_docs)]

mod error;
mod graphdb;

pub use error::{Error, Result};
pub use graphdb::GraphDb;

pub use qc_model::{Direction, Quad, Ref, Value};
pub use qc_writer::{TransactionBuffer, Writer};

/// SDK version matching the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{Error, GraphDb, Quad, Result, Value, Writer};
}
