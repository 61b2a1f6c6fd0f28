//! The lazy-cursor iterator algebra: a uniform scanner/index protocol over a
//! backend's `Ref`s, plus the logical operators (`And`, `Or`, `HasA`,
//! `LinksTo`, `Comparison`, `Limit`, ...) query front-ends compose into a
//! [`shape::Shape`] tree.
//!
//! This crate has no storage opinions of its own: [`backend::Backend`] is
//! the narrow read-path contract a concrete store (`qc-store`) implements,
//! and [`cursor::Cursor`] is what turns a `Shape` into something you can
//! actually drive with `next`/`contains`. Query planning (`qc-optimizer`)
//! rewrites a `Shape` before it ever reaches a `Cursor`.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod compare;
pub mod cursor;
pub mod error;
pub mod shape;
pub mod stats;
pub mod tags;

pub use backend::{Backend, BackendCursor};
pub use cursor::Cursor;
pub use error::IterError;
pub use shape::{CompareOp, Linkage, Shape};
pub use stats::Stats;
pub use tags::TagMap;
