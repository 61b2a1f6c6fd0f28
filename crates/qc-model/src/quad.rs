//! The owned 4-tuple quad type, generic over what occupies each position.

use crate::direction::Direction;
use crate::error::{ModelError, Result};
use crate::hash::Hash128;
use crate::value::{Value, ValueHash};
use std::fmt;

/// A subject/predicate/object/label quad.
///
/// `Quad` is generic over the position type `T` so the same shape serves two
/// roles: `Quad<Value>` is a fully materialized quad as produced by readers
/// and writers, while stores internally keep `Quad<ValueHash>` (or an
/// equivalent opaque [`crate::reference::Ref`]) to avoid duplicating large
/// literal payloads across every quad that references them.
///
/// `label` is `None` for the default graph.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quad<T> {
    pub subject: T,
    pub predicate: T,
    pub object: T,
    pub label: Option<T>,
}

impl<T> Quad<T> {
    pub fn new(subject: T, predicate: T, object: T, label: Option<T>) -> Self {
        Quad {
            subject,
            predicate,
            object,
            label,
        }
    }

    /// The value in the given direction, or `None` if `direction` is
    /// `Label` and this quad has no graph label, or `Any`.
    pub fn get(&self, direction: Direction) -> Option<&T> {
        match direction {
            Direction::Subject => Some(&self.subject),
            Direction::Predicate => Some(&self.predicate),
            Direction::Object => Some(&self.object),
            Direction::Label => self.label.as_ref(),
            Direction::Any => None,
        }
    }

    /// Like [`Quad::get`], but errors on `Any` rather than returning `None`
    /// silently, for callers where an `Any` direction is a programming bug.
    pub fn require(&self, direction: Direction) -> Result<&T> {
        if direction.is_any() {
            return Err(ModelError::NoSuchDirection(direction));
        }
        self.get(direction)
            .ok_or(ModelError::NoSuchDirection(direction))
    }

    /// Iterate the populated (direction, value) pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL
            .into_iter()
            .filter_map(move |d| self.get(d).map(|v| (d, v)))
    }

    /// Transform every position, preserving structure.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Quad<U> {
        Quad {
            subject: f(&self.subject),
            predicate: f(&self.predicate),
            object: f(&self.object),
            label: self.label.as_ref().map(&mut f),
        }
    }
}

impl Quad<Value> {
    pub fn content_hash(&self) -> QuadHash {
        let mut bytes = Vec::with_capacity(4 * 16);
        bytes.extend_from_slice(&self.subject.content_hash().0.to_be_bytes());
        bytes.extend_from_slice(&self.predicate.content_hash().0.to_be_bytes());
        bytes.extend_from_slice(&self.object.content_hash().0.to_be_bytes());
        let label_hash = self
            .label
            .as_ref()
            .map(|l| l.content_hash().0)
            .unwrap_or(Hash128::NIL);
        bytes.extend_from_slice(&label_hash.to_be_bytes());
        QuadHash(Hash128::of(&bytes))
    }
}

impl Quad<ValueHash> {
    pub fn content_hash(&self) -> QuadHash {
        let mut bytes = Vec::with_capacity(4 * 16);
        bytes.extend_from_slice(&self.subject.0.to_be_bytes());
        bytes.extend_from_slice(&self.predicate.0.to_be_bytes());
        bytes.extend_from_slice(&self.object.0.to_be_bytes());
        let label_hash = self.label.map(|l| l.0).unwrap_or(Hash128::NIL);
        bytes.extend_from_slice(&label_hash.to_be_bytes());
        QuadHash(Hash128::of(&bytes))
    }
}

impl fmt::Display for Quad<Value> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} {} {} {}", self.subject, self.predicate, self.object, label),
            None => write!(f, "{} {} {}", self.subject, self.predicate, self.object),
        }
    }
}

/// The content hash of a quad: a pure function of its four positions'
/// content hashes, independent of any backend-assigned identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuadHash(pub Hash128);

impl fmt::Display for QuadHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Quad<Value> {
        Quad::new(
            Value::iri("http://example.org/alice").unwrap(),
            Value::iri("http://example.org/knows").unwrap(),
            Value::iri("http://example.org/bob").unwrap(),
            None,
        )
    }

    #[test]
    fn get_by_direction() {
        let q = quad();
        assert_eq!(q.get(Direction::Subject), Some(&q.subject));
        assert_eq!(q.get(Direction::Label), None);
        assert_eq!(q.get(Direction::Any), None);
    }

    #[test]
    fn same_quad_same_hash() {
        assert_eq!(quad().content_hash(), quad().content_hash());
    }

    #[test]
    fn label_changes_hash() {
        let unlabeled = quad();
        let labeled = Quad::new(
            unlabeled.subject.clone(),
            unlabeled.predicate.clone(),
            unlabeled.object.clone(),
            Some(Value::iri("http://example.org/g1").unwrap()),
        );
        assert_ne!(unlabeled.content_hash(), labeled.content_hash());
    }

    #[test]
    fn map_preserves_structure() {
        let q = quad();
        let mapped = q.map(|v| v.content_hash());
        assert_eq!(mapped.label, None);
        assert_eq!(mapped.subject, q.subject.content_hash());
    }

    #[test]
    fn iter_skips_absent_label() {
        let q = quad();
        assert_eq!(q.iter().count(), 3);
    }
}
