//! Token model for the tagged wire format
//!
//! [`Token`] is what the reader exposes: plain JSON structure plus the
//! tagged scalars and the structural wrappers. [`WireType`] is the database
//! type a token denotes.

use std::fmt;

/// Lexical category of the reader's current position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// Before the first read
    None,
    /// `{` of a plain or escaped object
    StartObject,
    /// Close of a plain or escaped object
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// Start of a `@set`
    StartPage,
    /// Close of a `@set`
    EndPage,
    /// Start of a `@ref`
    StartRef,
    /// Close of a `@ref`
    EndRef,
    /// Start of a `@doc`
    StartDocument,
    /// Close of a `@doc`
    EndDocument,
    /// Object key
    FieldName,
    /// JSON string
    String,
    /// `@bytes`
    Bytes,
    /// `@int`
    Int,
    /// `@long`
    Long,
    /// `@double`
    Double,
    /// `@date`
    Date,
    /// `@time`
    Time,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `@stream`
    Stream,
    /// `@mod`
    Module,
}

impl Token {
    /// Name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Token::None => "None",
            Token::StartObject => "StartObject",
            Token::EndObject => "EndObject",
            Token::StartArray => "StartArray",
            Token::EndArray => "EndArray",
            Token::StartPage => "StartPage",
            Token::EndPage => "EndPage",
            Token::StartRef => "StartRef",
            Token::EndRef => "EndRef",
            Token::StartDocument => "StartDocument",
            Token::EndDocument => "EndDocument",
            Token::FieldName => "FieldName",
            Token::String => "String",
            Token::Bytes => "Bytes",
            Token::Int => "Int",
            Token::Long => "Long",
            Token::Double => "Double",
            Token::Date => "Date",
            Token::Time => "Time",
            Token::True => "True",
            Token::False => "False",
            Token::Null => "Null",
            Token::Stream => "Stream",
            Token::Module => "Module",
        }
    }

    /// Check if this token opens a container
    pub fn is_start(&self) -> bool {
        matches!(
            self,
            Token::StartObject
                | Token::StartArray
                | Token::StartPage
                | Token::StartRef
                | Token::StartDocument
        )
    }

    /// Check if this token closes a container
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            Token::EndObject | Token::EndArray | Token::EndPage | Token::EndRef | Token::EndDocument
        )
    }

    /// The close token matching a start token
    pub fn end_token(&self) -> Option<Token> {
        match self {
            Token::StartObject => Some(Token::EndObject),
            Token::StartArray => Some(Token::EndArray),
            Token::StartPage => Some(Token::EndPage),
            Token::StartRef => Some(Token::EndRef),
            Token::StartDocument => Some(Token::EndDocument),
            _ => None,
        }
    }

    /// Database type denoted by this token.
    ///
    /// `None` for tokens that do not begin a value (`None`, close tokens,
    /// field names).
    pub fn wire_type(&self) -> Option<WireType> {
        match self {
            Token::StartObject => Some(WireType::Object),
            Token::StartArray => Some(WireType::Array),
            Token::StartPage => Some(WireType::Set),
            Token::StartRef => Some(WireType::Ref),
            Token::StartDocument => Some(WireType::Document),
            Token::String => Some(WireType::String),
            Token::Bytes => Some(WireType::Bytes),
            Token::Int => Some(WireType::Int),
            Token::Long => Some(WireType::Long),
            Token::Double => Some(WireType::Double),
            Token::Date => Some(WireType::Date),
            Token::Time => Some(WireType::Time),
            Token::True | Token::False => Some(WireType::Boolean),
            Token::Null => Some(WireType::Null),
            Token::Stream => Some(WireType::Stream),
            Token::Module => Some(WireType::Module),
            Token::None
            | Token::EndObject
            | Token::EndArray
            | Token::EndPage
            | Token::EndRef
            | Token::EndDocument
            | Token::FieldName => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Database types a codec can accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// `@int`
    Int,
    /// `@long`
    Long,
    /// `@double`
    Double,
    /// JSON string
    String,
    /// `@bytes`
    Bytes,
    /// `@date`
    Date,
    /// `@time`
    Time,
    /// `@mod`
    Module,
    /// `@stream`
    Stream,
    /// JSON array
    Array,
    /// Plain or escaped object
    Object,
    /// `@set`
    Set,
    /// `@doc`
    Document,
    /// `@ref`
    Ref,
}

impl WireType {
    /// Name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            WireType::Null => "Null",
            WireType::Boolean => "Boolean",
            WireType::Int => "Int",
            WireType::Long => "Long",
            WireType::Double => "Double",
            WireType::String => "String",
            WireType::Bytes => "Bytes",
            WireType::Date => "Date",
            WireType::Time => "Time",
            WireType::Module => "Module",
            WireType::Stream => "Stream",
            WireType::Array => "Array",
            WireType::Object => "Object",
            WireType::Set => "Set",
            WireType::Document => "Document",
            WireType::Ref => "Ref",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTS: [Token; 5] = [
        Token::StartObject,
        Token::StartArray,
        Token::StartPage,
        Token::StartRef,
        Token::StartDocument,
    ];

    #[test]
    fn test_every_start_has_an_end() {
        for start in STARTS {
            let end = start.end_token().unwrap();
            assert!(start.is_start());
            assert!(end.is_end());
            assert!(!end.is_start());
        }
    }

    #[test]
    fn test_scalars_are_neither_start_nor_end() {
        for t in [Token::Int, Token::String, Token::Null, Token::FieldName] {
            assert!(!t.is_start());
            assert!(!t.is_end());
            assert_eq!(t.end_token(), None);
        }
    }

    #[test]
    fn test_wire_type_mapping() {
        assert_eq!(Token::True.wire_type(), Some(WireType::Boolean));
        assert_eq!(Token::False.wire_type(), Some(WireType::Boolean));
        assert_eq!(Token::StartPage.wire_type(), Some(WireType::Set));
        assert_eq!(Token::EndPage.wire_type(), None);
        assert_eq!(Token::FieldName.wire_type(), None);
    }
}
