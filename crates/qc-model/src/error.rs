use thiserror::Error;

/// Errors raised while constructing or interpreting model values.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IRI value is empty")]
    EmptyIri,

    #[error("blank node label is empty")]
    EmptyBlankNode,

    #[error("typed string datatype IRI is empty")]
    EmptyDatatype,

    #[error("language tag is empty")]
    EmptyLanguageTag,

    #[error("ref does not carry a prefetched denotation")]
    RefNotPrefetched,

    #[error("ref kind mismatch: expected {expected}, found {found}")]
    RefKindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("direction {0:?} is not valid on a quad without a graph label")]
    NoSuchDirection(crate::Direction),
}

pub type Result<T> = std::result::Result<T, ModelError>;
