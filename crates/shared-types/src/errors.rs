//! # Error Types
//!
//! Errors raised while constructing or reading shared entities.

use thiserror::Error;

/// Errors raised while parsing an [`Identifier`](crate::Identifier).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifierError {
    /// Raw bytes are not exactly 32 bytes long.
    #[error("Identifier must be 32 bytes long, got {0}")]
    InvalidLength(usize),

    /// Text is not valid base58.
    #[error("Invalid base58 identifier: {0}")]
    InvalidBase58(String),

    /// JSON value is neither a base58 string nor a byte array.
    #[error("Identifier must be a base58 string or a byte array")]
    InvalidJsonType,
}

/// Errors raised while reading entity payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityError {
    /// A required property is absent.
    #[error("Property {0} is missing")]
    MissingProperty(String),

    /// A property holds a value of the wrong type.
    #[error("Property {property} should be {expected}")]
    UnexpectedType {
        property: String,
        expected: &'static str,
    },

    /// A property holds an identifier that does not parse.
    #[error("Property {property} is not a valid identifier: {source}")]
    InvalidIdentifier {
        property: String,
        source: IdentifierError,
    },

    /// A document type is not defined by the data contract.
    #[error("Document type {0} is not defined")]
    UnknownDocumentType(String),
}
