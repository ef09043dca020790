//! Error types for tagged-value encoding and decoding
//!
//! All codec operations report failures through [`CodecError`]. The variants
//! follow the wire-level taxonomy:
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `Decode` | Token incompatible with the requested conversion, malformed input |
//! | `UnexpectedEnd` | Input ended in the middle of a value |
//! | `NullDocument` | A reference resolved to a document that does not exist |
//! | `Resolution` | No codec can be constructed for a requested type |
//! | `Encode` | A native value has no wire representation |

use crate::document::NullDocument;
use thiserror::Error;

/// Errors produced by readers, writers and codecs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CodecError {
    /// Current token incompatible with the requested conversion, or malformed input
    #[error("decode error: {message}")]
    Decode {
        /// Human-readable description naming the offending token and context
        message: String,
    },

    /// Input ended before the current value was complete
    #[error("unexpected end of input")]
    UnexpectedEnd,

    /// The decoded reference points at a document that does not exist
    #[error("document {} in collection {} does not exist: {}", .0.key, .0.coll, .0.cause)]
    NullDocument(NullDocument),

    /// No codec can be constructed for the requested type
    #[error("cannot resolve codec for {type_name}: {reason}")]
    Resolution {
        /// Name of the requested type
        type_name: String,
        /// Why resolution failed
        reason: String,
    },

    /// A native value cannot be represented on the wire
    #[error("encode error: {message}")]
    Encode {
        /// Human-readable description
        message: String,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Create a decode error from any displayable message
    pub fn decode(message: impl Into<String>) -> Self {
        CodecError::Decode {
            message: message.into(),
        }
    }

    /// Create an encode error from any displayable message
    pub fn encode(message: impl Into<String>) -> Self {
        CodecError::Encode {
            message: message.into(),
        }
    }

    /// Create a resolution error for the named type
    pub fn resolution(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::Resolution {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Decode error for a token that the named codec does not accept.
    ///
    /// `supported` lists the token names the codec would have accepted.
    pub fn unsupported_token(codec: &str, actual: &str, supported: &[&str]) -> Self {
        CodecError::decode(format!(
            "unable to decode `{}` with `{}`. Supported types for codec are [{}].",
            actual,
            codec,
            supported.join(", ")
        ))
    }

    /// Check if this is the null-document condition
    pub fn is_null_document(&self) -> bool {
        matches!(self, CodecError::NullDocument(_))
    }

    /// Check if decoding may succeed once more input is available.
    ///
    /// Only a truncated input qualifies; every other error is final for the
    /// bytes already seen.
    pub fn is_retryable_with_more_input(&self) -> bool {
        matches!(self, CodecError::UnexpectedEnd)
    }

    /// Extract the null document carried by this error, if any
    pub fn into_null_document(self) -> Option<NullDocument> {
        match self {
            CodecError::NullDocument(doc) => Some(doc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentKey;
    use crate::value::Module;

    #[test]
    fn test_unsupported_token_names_codec_and_types() {
        let err = CodecError::unsupported_token("Int", "String", &["Int", "Null"]);
        let msg = err.to_string();
        assert!(msg.contains("`String`"));
        assert!(msg.contains("`Int`"));
        assert!(msg.contains("[Int, Null]"));
    }

    #[test]
    fn test_null_document_display() {
        let err = CodecError::NullDocument(NullDocument::new(
            DocumentKey::Id("123".into()),
            Module::new("Foo"),
            "not found",
        ));
        assert!(err.is_null_document());
        assert_eq!(
            err.to_string(),
            "document 123 in collection Foo does not exist: not found"
        );
    }

    #[test]
    fn test_only_truncation_is_retryable() {
        assert!(CodecError::UnexpectedEnd.is_retryable_with_more_input());
        assert!(!CodecError::decode("bad").is_retryable_with_more_input());
        assert!(!CodecError::resolution("Foo", "bad").is_retryable_with_more_input());
    }

    #[test]
    fn test_into_null_document() {
        let doc = NullDocument::new(DocumentKey::Name("n".into()), Module::new("C"), "deleted");
        let err = CodecError::NullDocument(doc.clone());
        assert_eq!(err.into_null_document(), Some(doc));
        assert_eq!(CodecError::UnexpectedEnd.into_null_document(), None);
    }
}
