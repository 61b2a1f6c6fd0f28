//! Value, direction, quad and content-hash types shared across quadcore.
//!
//! This crate has no opinion about storage, iteration, or query planning —
//! those live in `qc-store`, `qc-iter` and `qc-optimizer` respectively. It
//! only defines the data that flows between them.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]
#![allow(missing_docs)] // relaxed below module-by-module as they stabilize

mod direction;
mod error;
mod hash;
mod quad;
mod reference;
mod value;

pub use direction::Direction;
pub use error::{ModelError, Result};
pub use hash::Hash128;
pub use quad::{Quad, QuadHash};
pub use reference::{Denotation, Ref, RefKind};
pub use value::{Value, ValueHash, ValueType};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke() {
        let q = Quad::new(
            Value::iri("http://example.org/alice").unwrap(),
            Value::iri("http://example.org/knows").unwrap(),
            Value::iri("http://example.org/bob").unwrap(),
            None,
        );
        assert_eq!(q.get(Direction::Object).unwrap().as_iri(), Some("http://example.org/bob"));
        assert!(!q.content_hash().0.is_nil());
    }
}
