//! Document and reference types
//!
//! The server returns documents in four shapes:
//!
//! | Shape | Identified by | Carries |
//! |-------|---------------|---------|
//! | [`Document`] | id | coll, ts, data |
//! | [`NamedDocument`] | name | coll, ts, data |
//! | [`DocumentRef`] | id | coll |
//! | [`NamedDocumentRef`] | name | coll |
//!
//! A reference to a document that does not exist is reported as a
//! [`NullDocument`], carrying the server's explanation in `cause`.
//!
//! Like [`Value`], these types derive serde for in-process use only; the
//! serde form is not the `@doc`/`@ref` wire shape.

use crate::value::{Module, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How a document is addressed: by server id or by user-defined name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKey {
    /// Server-assigned document id
    Id(String),
    /// Name of a named document (schema items, for example)
    Name(String),
}

impl DocumentKey {
    /// The raw id or name
    pub fn as_str(&self) -> &str {
        match self {
            DocumentKey::Id(s) | DocumentKey::Name(s) => s,
        }
    }

    /// Wire field name used for this key (`id` or `name`)
    pub fn field_name(&self) -> &'static str {
        match self {
            DocumentKey::Id(_) => "id",
            DocumentKey::Name(_) => "name",
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document addressed by id, with its timestamp and user data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: String,
    /// Owning collection
    pub coll: Module,
    /// Last write timestamp
    pub ts: DateTime<Utc>,
    /// User data fields
    pub data: HashMap<String, Value>,
}

impl Document {
    /// Create a document with no data fields
    pub fn new(id: impl Into<String>, coll: Module, ts: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            coll,
            ts,
            data: HashMap::new(),
        }
    }

    /// Builder-style data field insertion
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a data field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Reference to this document
    pub fn to_ref(&self) -> DocumentRef {
        DocumentRef::new(self.id.clone(), self.coll.clone())
    }
}

/// A document addressed by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedDocument {
    /// Document name
    pub name: String,
    /// Owning collection
    pub coll: Module,
    /// Last write timestamp
    pub ts: DateTime<Utc>,
    /// User data fields
    pub data: HashMap<String, Value>,
}

impl NamedDocument {
    /// Create a named document with no data fields
    pub fn new(name: impl Into<String>, coll: Module, ts: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            coll,
            ts,
            data: HashMap::new(),
        }
    }

    /// Get a data field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Reference to this document
    pub fn to_ref(&self) -> NamedDocumentRef {
        NamedDocumentRef::new(self.name.clone(), self.coll.clone())
    }
}

/// Reference to a document by id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Document id
    pub id: String,
    /// Owning collection
    pub coll: Module,
}

impl DocumentRef {
    /// Create a reference
    pub fn new(id: impl Into<String>, coll: Module) -> Self {
        Self { id: id.into(), coll }
    }
}

/// Reference to a document by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedDocumentRef {
    /// Document name
    pub name: String,
    /// Owning collection
    pub coll: Module,
}

impl NamedDocumentRef {
    /// Create a reference
    pub fn new(name: impl Into<String>, coll: Module) -> Self {
        Self {
            name: name.into(),
            coll,
        }
    }
}

/// A reference that resolved to a nonexistent document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NullDocument {
    /// Id or name of the missing document
    pub key: DocumentKey,
    /// Collection the reference pointed into
    pub coll: Module,
    /// Server explanation, e.g. `"not found"` or `"deleted"`
    pub cause: String,
}

impl NullDocument {
    /// Create a null document
    pub fn new(key: DocumentKey, coll: Module, cause: impl Into<String>) -> Self {
        Self {
            key,
            coll,
            cause: cause.into(),
        }
    }
}

/// Outcome of decoding a document when the caller accepts nonexistence
///
/// Decoding into `NullableDocument<T>` never fails with the null-document
/// condition; it yields [`NullableDocument::Null`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NullableDocument<T> {
    /// The document exists and decoded successfully
    Present(T),
    /// The reference resolved to a nonexistent document
    Null(NullDocument),
}

impl<T> NullableDocument<T> {
    /// Check if the document exists
    pub fn is_present(&self) -> bool {
        matches!(self, NullableDocument::Present(_))
    }

    /// Borrow the document if present
    pub fn get(&self) -> Option<&T> {
        match self {
            NullableDocument::Present(v) => Some(v),
            NullableDocument::Null(_) => None,
        }
    }

    /// Convert into the document, or the null document as an error
    pub fn into_result(self) -> Result<T, NullDocument> {
        match self {
            NullableDocument::Present(v) => Ok(v),
            NullableDocument::Null(n) => Err(n),
        }
    }

    /// The null document, if the reference did not resolve
    pub fn null_document(&self) -> Option<&NullDocument> {
        match self {
            NullableDocument::Present(_) => None,
            NullableDocument::Null(n) => Some(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_document_key_field_names() {
        assert_eq!(DocumentKey::Id("1".into()).field_name(), "id");
        assert_eq!(DocumentKey::Name("n".into()).field_name(), "name");
        assert_eq!(DocumentKey::Name("n".into()).to_string(), "n");
    }

    #[test]
    fn test_document_to_ref() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let doc = Document::new("123", Module::new("Foo"), ts).with_field("a", 1);
        assert_eq!(doc.get("a"), Some(&Value::Int(1)));
        assert_eq!(doc.to_ref(), DocumentRef::new("123", Module::new("Foo")));
    }

    #[test]
    fn test_serde_form_round_trips() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let doc = Document::new("123", Module::new("Foo"), ts).with_field("a", 1);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("@doc"));
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_nullable_document_accessors() {
        let present: NullableDocument<i32> = NullableDocument::Present(5);
        assert!(present.is_present());
        assert_eq!(present.get(), Some(&5));
        assert_eq!(present.into_result(), Ok(5));

        let missing = NullDocument::new(DocumentKey::Id("1".into()), Module::new("C"), "gone");
        let null: NullableDocument<i32> = NullableDocument::Null(missing.clone());
        assert!(!null.is_present());
        assert_eq!(null.null_document(), Some(&missing));
        assert_eq!(null.into_result(), Err(missing));
    }
}
