//! Fixed-width, collision-resistant content hashing for values and quads.

use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

/// A 128-bit content digest.
///
/// The all-zero digest is reserved as the "nil" sentinel (e.g. the default
/// graph label, or "no value"). It is never produced by [`Hash128::of`] for
/// non-empty input in practice, but callers that need the sentinel should
/// use [`Hash128::NIL`] explicitly rather than relying on that.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hash128(pub u128);

impl Hash128 {
    /// The all-zero sentinel, meaning "no label" / "nil".
    pub const NIL: Hash128 = Hash128(0);

    /// Hash a byte slice with XXH3-128.
    pub fn of(bytes: &[u8]) -> Self {
        Hash128(xxh3_128(bytes))
    }

    /// True if this is the [`Hash128::NIL`] sentinel.
    pub fn is_nil(&self) -> bool {
        self.0 == 0
    }

    /// Big-endian byte representation, suitable for use as a sortable index key.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Reconstruct from the big-endian byte representation.
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Hash128(u128::from_be_bytes(bytes))
    }
}

impl fmt::Debug for Hash128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash128({:032x})", self.0)
    }
}

impl fmt::Display for Hash128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_zero() {
        assert!(Hash128::NIL.is_nil());
        assert_eq!(Hash128::NIL.0, 0);
    }

    #[test]
    fn same_bytes_same_hash() {
        let a = Hash128::of(b"hello");
        let b = Hash128::of(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_different_hash() {
        let a = Hash128::of(b"hello");
        let b = Hash128::of(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn round_trips_through_bytes() {
        let h = Hash128::of(b"round-trip-me");
        let back = Hash128::from_be_bytes(h.to_be_bytes());
        assert_eq!(h, back);
    }
}
