//! Unified error type for the facade.
//!
//! Wraps codec failures and adds the two failure modes that only exist at
//! the response level: a server-reported query error, and an envelope that
//! does not have the expected shape.

use crate::response::QueryFailure;
use docwire_core::{CodecError, NullDocument};
use thiserror::Error;

/// All docwire errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Encoding, decoding or codec resolution failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The server answered with an error envelope
    #[error("query failed [{code}]: {message}")]
    Query {
        /// Error code reported by the server
        code: String,
        /// Human-readable message reported by the server
        message: String,
    },

    /// A response or event envelope is missing required parts
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for docwire operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is the null-document condition.
    pub fn is_null_document(&self) -> bool {
        matches!(self, Error::Codec(e) if e.is_null_document())
    }

    /// Check if the input was truncated and more bytes could complete it.
    pub fn needs_more_input(&self) -> bool {
        matches!(self, Error::Codec(e) if e.is_retryable_with_more_input())
    }

    /// Check if the server rejected the query.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, Error::Query { .. })
    }

    /// The missing document, when this is the null-document condition
    pub fn null_document(&self) -> Option<&NullDocument> {
        match self {
            Error::Codec(CodecError::NullDocument(null)) => Some(null),
            _ => None,
        }
    }
}

impl From<QueryFailure> for Error {
    fn from(failure: QueryFailure) -> Self {
        Error::Query {
            code: failure.error.code,
            message: failure.error.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwire_core::{DocumentKey, Module};

    #[test]
    fn test_codec_errors_pass_through() {
        let err: Error = CodecError::UnexpectedEnd.into();
        assert!(err.needs_more_input());
        assert!(!err.is_null_document());
        assert_eq!(err.to_string(), "unexpected end of input");
    }

    #[test]
    fn test_null_document_is_reachable() {
        let null = NullDocument::new(DocumentKey::Id("1".into()), Module::new("C"), "not found");
        let err: Error = CodecError::NullDocument(null.clone()).into();
        assert!(err.is_null_document());
        assert_eq!(err.null_document(), Some(&null));
    }

    #[test]
    fn test_query_error_display() {
        let err = Error::Query {
            code: "invalid_query".into(),
            message: "bad".into(),
        };
        assert!(err.is_query_failure());
        assert_eq!(err.to_string(), "query failed [invalid_query]: bad");
    }
}
