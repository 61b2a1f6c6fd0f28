//! The opaque options dictionary passed to backend factories (spec.md §6).

use std::collections::BTreeMap;
use std::fmt;

/// A value in an [`Options`] dictionary. Backends interpret their own
/// recognized keys; unrecognized keys are ignored rather than rejected, so
/// the same dictionary can be shared across backends that only honor a
/// subset of it.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}
impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}
impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}
impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

/// How strictly a backend must flush a write before acknowledging it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Acknowledge once the write is applied to the backend's in-memory
    /// state/write-ahead buffer.
    #[default]
    Soft,
    /// Acknowledge only once the write is fsync'd to durable storage.
    Hard,
}

/// How a read should treat replica/cache staleness (spec.md §6). The core
/// treats replication as out of scope (§1 Non-goals); this enum exists so
/// the recognized-key surface is complete even though the reference
/// backends only ever have one copy of the data and always behave as
/// `Single`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReadMode {
    #[default]
    Single,
    Majority,
    Outdated,
}

/// The recognized, backend-agnostic subset of an [`Options`] dictionary.
/// Backends read their own keys out of the raw map directly for anything
/// beyond this; `parsed()` exists so common keys (batch size, durability)
/// don't need re-parsing in every backend.
#[derive(Clone, Debug, Default)]
pub struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub fn new() -> Self {
        Options(BTreeMap::new())
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn database_name(&self) -> Option<&str> {
        self.get("database_name").and_then(OptionValue::as_str)
    }

    pub fn max_connections(&self) -> Option<i64> {
        self.get("max_connections").and_then(OptionValue::as_i64)
    }

    pub fn connection_timeout_ms(&self) -> Option<i64> {
        self.get("connection_timeout").and_then(OptionValue::as_i64)
    }

    pub fn batch_size(&self) -> Option<i64> {
        self.get("batch_size").and_then(OptionValue::as_i64)
    }

    pub fn durability_mode(&self) -> DurabilityMode {
        match self.get("durability_mode").and_then(OptionValue::as_str) {
            Some("hard") => DurabilityMode::Hard,
            _ => DurabilityMode::Soft,
        }
    }

    pub fn read_mode(&self) -> ReadMode {
        match self.get("read_mode").and_then(OptionValue::as_str) {
            Some("majority") => ReadMode::Majority,
            Some("outdated") => ReadMode::Outdated,
            _ => ReadMode::Single,
        }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Options(")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_durability_defaults_soft() {
        assert_eq!(Options::new().durability_mode(), DurabilityMode::Soft);
    }

    #[test]
    fn recognized_keys_round_trip() {
        let opts = Options::new()
            .set("database_name", "quadcore")
            .set("batch_size", 10i64)
            .set("durability_mode", "hard");
        assert_eq!(opts.database_name(), Some("quadcore"));
        assert_eq!(opts.batch_size(), Some(10));
        assert_eq!(opts.durability_mode(), DurabilityMode::Hard);
    }
}
