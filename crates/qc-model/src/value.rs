//! The closed set of node values a quad's positions can hold.

use crate::error::{ModelError, Result};
use crate::hash::Hash128;
use chrono::{DateTime, Utc};
use std::fmt;

/// A node value.
///
/// `Value` is a closed sum type: every variant a backend needs to persist is
/// enumerated here, there is no open-ended "any serde type" escape hatch.
/// Two `Value`s that compare equal always serialize to the same canonical
/// form and therefore hash to the same [`Hash128`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// An absolute IRI, e.g. `http://example.org/alice`.
    Iri(String),
    /// A blank node identifier, scoped to the store it came from.
    BNode(String),
    /// A plain string with no language tag or datatype.
    String(String),
    /// A string paired with a datatype IRI, e.g. `"42"^^xsd:integer`.
    TypedString { value: String, datatype: String },
    /// A string paired with a BCP-47 language tag, e.g. `"chat"@en`.
    LangString { value: String, lang: String },
    /// A native signed 64-bit integer.
    Int(i64),
    /// A native IEEE-754 double.
    Float(f64),
    /// A native boolean.
    Bool(bool),
    /// A UTC instant.
    Time(DateTime<Utc>),
    /// An opaque byte string, for values with no useful textual form.
    Raw(Vec<u8>),
}

impl Value {
    pub fn iri(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError::EmptyIri);
        }
        Ok(Value::Iri(s))
    }

    pub fn bnode(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError::EmptyBlankNode);
        }
        Ok(Value::BNode(s))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn typed_string(value: impl Into<String>, datatype: impl Into<String>) -> Result<Self> {
        let datatype = datatype.into();
        if datatype.is_empty() {
            return Err(ModelError::EmptyDatatype);
        }
        Ok(Value::TypedString {
            value: value.into(),
            datatype,
        })
    }

    pub fn lang_string(value: impl Into<String>, lang: impl Into<String>) -> Result<Self> {
        let lang = lang.into();
        if lang.is_empty() {
            return Err(ModelError::EmptyLanguageTag);
        }
        Ok(Value::LangString {
            value: value.into(),
            lang,
        })
    }

    pub fn int(v: i64) -> Self {
        Value::Int(v)
    }

    pub fn float(v: f64) -> Self {
        Value::Float(v)
    }

    pub fn bool(v: bool) -> Self {
        Value::Bool(v)
    }

    pub fn time(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }

    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Raw(bytes.into())
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Value::Iri(_))
    }

    pub fn is_bnode(&self) -> bool {
        matches!(self, Value::BNode(_))
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Value::Iri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// A short tag naming this variant, stable across releases; used as the
    /// leading type byte of the canonical encoding and by the optimizer's
    /// primitive-type range-scan rewrite.
    pub fn type_tag(&self) -> ValueType {
        match self {
            Value::Iri(_) => ValueType::Iri,
            Value::BNode(_) => ValueType::BNode,
            Value::String(_) => ValueType::String,
            Value::TypedString { .. } => ValueType::TypedString,
            Value::LangString { .. } => ValueType::LangString,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
            Value::Time(_) => ValueType::Time,
            Value::Raw(_) => ValueType::Raw,
        }
    }

    /// Canonical byte encoding used both for content hashing and for
    /// comparison-operator range scans. The leading byte is the type tag so
    /// that values of different variants never collide.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        out.push(self.type_tag() as u8);
        match self {
            Value::Iri(s) | Value::BNode(s) | Value::String(s) => out.extend_from_slice(s.as_bytes()),
            Value::TypedString { value, datatype } => {
                out.extend_from_slice(&(datatype.len() as u32).to_be_bytes());
                out.extend_from_slice(datatype.as_bytes());
                out.extend_from_slice(value.as_bytes());
            }
            Value::LangString { value, lang } => {
                out.extend_from_slice(&(lang.len() as u32).to_be_bytes());
                out.extend_from_slice(lang.as_bytes());
                out.extend_from_slice(value.as_bytes());
            }
            Value::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Float(v) => out.extend_from_slice(&v.to_be_bytes()),
            Value::Bool(v) => out.push(*v as u8),
            Value::Time(v) => out.extend_from_slice(&v.timestamp_nanos_opt().unwrap_or(0).to_be_bytes()),
            Value::Raw(bytes) => out.extend_from_slice(bytes),
        }
        out
    }

    /// Content hash of this value, stable across processes and releases.
    pub fn content_hash(&self) -> ValueHash {
        ValueHash(Hash128::of(&self.canonical_bytes()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(s) => write!(f, "<{s}>"),
            Value::BNode(s) => write!(f, "_:{s}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::TypedString { value, datatype } => write!(f, "{value:?}^^<{datatype}>"),
            Value::LangString { value, lang } => write!(f, "{value:?}@{lang}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Raw(bytes) => write!(f, "0x{}", hex(bytes)),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The type tag embedded in [`Value::canonical_bytes`]; also used by the
/// optimizer to recognize "all values of this primitive type" range scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueType {
    Iri = 0,
    BNode = 1,
    String = 2,
    TypedString = 3,
    LangString = 4,
    Int = 5,
    Float = 6,
    Bool = 7,
    Time = 8,
    Raw = 9,
}

/// The content hash of a [`Value`]. Two equal values always have equal hashes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueHash(pub Hash128);

impl fmt::Display for ValueHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_values_hash_equal() {
        let a = Value::iri("http://example.org/a").unwrap();
        let b = Value::iri("http://example.org/a").unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn different_variants_never_collide_by_tag() {
        let iri = Value::iri("42").unwrap();
        let s = Value::string("42");
        assert_ne!(iri.content_hash(), s.content_hash());
    }

    #[test]
    fn typed_string_distinguishes_datatype() {
        let a = Value::typed_string("1", "xsd:integer").unwrap();
        let b = Value::typed_string("1", "xsd:string").unwrap();
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn empty_iri_rejected() {
        assert!(Value::iri("").is_err());
    }

    #[test]
    fn empty_lang_rejected() {
        assert!(Value::lang_string("hi", "").is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::iri("http://x").unwrap().to_string(), "<http://x>");
        assert_eq!(Value::bnode("b0").unwrap().to_string(), "_:b0");
        assert_eq!(Value::int(7).to_string(), "7");
        assert_eq!(Value::bool(true).to_string(), "true");
    }
}
