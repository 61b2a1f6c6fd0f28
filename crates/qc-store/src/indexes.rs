//! Secondary index key construction (spec.md §5): one index per quad
//! direction, one per unordered direction pair, plus the node value/type
//! index. Concrete backends own the actual index storage; this module only
//! fixes the key encoding so every backend agrees on it.

use qc_model::{Direction, Hash128, ValueType};

/// The four single-direction quad indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SingleIndex {
    Subject,
    Predicate,
    Object,
    Label,
}

impl SingleIndex {
    pub fn of(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Subject => Some(SingleIndex::Subject),
            Direction::Predicate => Some(SingleIndex::Predicate),
            Direction::Object => Some(SingleIndex::Object),
            Direction::Label => Some(SingleIndex::Label),
            Direction::Any => None,
        }
    }

    /// Key under which `quad_iterator(direction, node)` looks up its
    /// candidate quad ids: the index tag followed by the node's hash.
    pub fn key(self, node: Hash128) -> [u8; 17] {
        let mut out = [0u8; 17];
        out[0] = self as u8;
        out[1..].copy_from_slice(&node.to_be_bytes());
        out
    }
}

/// The six unordered direction-pair indexes a hoisted `And{mandatory:
/// LinksTo, optional: LinksTo}` can be dispatched against once both sides
/// are pinned to a concrete node (spec.md §5, §6.2 rewrite 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PairIndex {
    SubjectPredicate,
    SubjectObject,
    SubjectLabel,
    PredicateObject,
    PredicateLabel,
    ObjectLabel,
}

impl PairIndex {
    /// Canonicalize an unordered `(d1, d2)` pair to its index and the
    /// matching `(hash1, hash2)` order, or `None` if either direction is not
    /// one of the four concrete ones, or they're equal.
    pub fn for_directions(d1: Direction, d2: Direction) -> Option<Self> {
        use Direction::*;
        match (d1, d2) {
            (Subject, Predicate) | (Predicate, Subject) => Some(PairIndex::SubjectPredicate),
            (Subject, Object) | (Object, Subject) => Some(PairIndex::SubjectObject),
            (Subject, Label) | (Label, Subject) => Some(PairIndex::SubjectLabel),
            (Predicate, Object) | (Object, Predicate) => Some(PairIndex::PredicateObject),
            (Predicate, Label) | (Label, Predicate) => Some(PairIndex::PredicateLabel),
            (Object, Label) | (Label, Object) => Some(PairIndex::ObjectLabel),
            _ => None,
        }
    }

    /// Key for a pinned pair of node hashes; order-independent, so callers
    /// don't need to track which physical direction came first.
    pub fn key(self, a: Hash128, b: Hash128) -> [u8; 33] {
        let (lo, hi) = if a.0 <= b.0 { (a, b) } else { (b, a) };
        let mut out = [0u8; 33];
        out[0] = self as u8;
        out[1..17].copy_from_slice(&lo.to_be_bytes());
        out[17..].copy_from_slice(&hi.to_be_bytes());
        out
    }
}

/// Key for the per-primitive-type node value index the optimizer's
/// comparison-over-`AllNodes`-of-primitive-type rewrite (spec.md §6.2 rewrite
/// 3) scans in sorted order.
pub fn value_type_index_key(value_type: ValueType, canonical_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + canonical_bytes.len());
    out.push(value_type as u8);
    out.extend_from_slice(canonical_bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_index_is_order_independent() {
        let a = Hash128::of(b"a");
        let b = Hash128::of(b"b");
        let idx = PairIndex::for_directions(Direction::Subject, Direction::Object).unwrap();
        assert_eq!(idx.key(a, b), idx.key(b, a));
    }

    #[test]
    fn pair_index_canonicalizes_direction_order() {
        assert_eq!(
            PairIndex::for_directions(Direction::Predicate, Direction::Subject),
            PairIndex::for_directions(Direction::Subject, Direction::Predicate),
        );
    }

    #[test]
    fn any_direction_has_no_single_index() {
        assert!(SingleIndex::of(Direction::Any).is_none());
    }

    #[test]
    fn same_direction_has_no_pair_index() {
        assert!(PairIndex::for_directions(Direction::Subject, Direction::Subject).is_none());
    }
}
