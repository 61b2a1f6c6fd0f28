//! `Ref` — an opaque handle a backend hands back from its quad store.

use crate::error::{ModelError, Result};
use crate::hash::Hash128;
use crate::quad::Quad;
use crate::value::Value;

/// What kind of thing a [`Ref`] denotes. Iterators and writers use this to
/// reject a `Ref` used in the wrong position without needing to resolve it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefKind {
    Node,
    Quad,
}

impl RefKind {
    fn label(self) -> &'static str {
        match self {
            RefKind::Node => "node",
            RefKind::Quad => "quad",
        }
    }
}

/// Either the node value or the quad a [`Ref`] was prefetched with, so
/// callers that already have the denotation in hand (e.g. right after an
/// insert) don't need a round trip back to the backend to read it.
#[derive(Clone, Debug, PartialEq)]
pub enum Denotation {
    Node(Value),
    Quad(Quad<Value>),
}

/// An opaque handle a [`crate::Store`] implementation hands back in place of
/// a fully materialized [`Value`] or [`Quad`]. Two `Ref`s are equal iff they
/// denote the same node or quad, regardless of whether either carries a
/// prefetched [`Denotation`].
///
/// Backends are free to choose any internal representation; `quadcore`
/// itself always uses the node's or quad's content hash as the identity
/// carried by a `Ref`, which is what makes `Ref`s stable across processes
/// and backend restarts.
#[derive(Clone, Debug)]
pub struct Ref {
    hash: Hash128,
    kind: RefKind,
    prefetched: Option<Denotation>,
}

impl Ref {
    pub fn node(hash: Hash128) -> Self {
        Ref {
            hash,
            kind: RefKind::Node,
            prefetched: None,
        }
    }

    pub fn quad(hash: Hash128) -> Self {
        Ref {
            hash,
            kind: RefKind::Quad,
            prefetched: None,
        }
    }

    pub fn node_with_value(hash: Hash128, value: Value) -> Self {
        Ref {
            hash,
            kind: RefKind::Node,
            prefetched: Some(Denotation::Node(value)),
        }
    }

    pub fn quad_with_value(hash: Hash128, quad: Quad<Value>) -> Self {
        Ref {
            hash,
            kind: RefKind::Quad,
            prefetched: Some(Denotation::Quad(quad)),
        }
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn hash(&self) -> Hash128 {
        self.hash
    }

    pub fn is_prefetched(&self) -> bool {
        self.prefetched.is_some()
    }

    /// The prefetched node value, if this ref is of [`RefKind::Node`] and
    /// carries one.
    pub fn prefetched_value(&self) -> Result<&Value> {
        match &self.prefetched {
            Some(Denotation::Node(v)) => Ok(v),
            Some(Denotation::Quad(_)) => Err(ModelError::RefKindMismatch {
                expected: RefKind::Node.label(),
                found: RefKind::Quad.label(),
            }),
            None => Err(ModelError::RefNotPrefetched),
        }
    }

    /// The prefetched quad, if this ref is of [`RefKind::Quad`] and carries one.
    pub fn prefetched_quad(&self) -> Result<&Quad<Value>> {
        match &self.prefetched {
            Some(Denotation::Quad(q)) => Ok(q),
            Some(Denotation::Node(_)) => Err(ModelError::RefKindMismatch {
                expected: RefKind::Quad.label(),
                found: RefKind::Node.label(),
            }),
            None => Err(ModelError::RefNotPrefetched),
        }
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.hash == other.hash
    }
}
impl Eq for Ref {}

impl std::hash::Hash for Ref {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.label().hash(state);
        self.hash.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_prefetch() {
        let h = Hash128::of(b"alice");
        let bare = Ref::node(h);
        let fetched = Ref::node_with_value(h, Value::iri("http://example.org/alice").unwrap());
        assert_eq!(bare, fetched);
    }

    #[test]
    fn different_kind_same_hash_not_equal() {
        let h = Hash128::of(b"x");
        assert_ne!(Ref::node(h), Ref::quad(h));
    }

    #[test]
    fn unprefetched_ref_errors_on_read() {
        let r = Ref::node(Hash128::of(b"x"));
        assert!(r.prefetched_value().is_err());
    }

    #[test]
    fn kind_mismatch_on_read() {
        let r = Ref::quad_with_value(
            Hash128::of(b"q"),
            Quad::new(
                Value::iri("http://a").unwrap(),
                Value::iri("http://b").unwrap(),
                Value::iri("http://c").unwrap(),
                None,
            ),
        );
        assert!(r.prefetched_value().is_err());
        assert!(r.prefetched_quad().is_ok());
    }
}
