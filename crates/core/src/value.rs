//! Value types for tagged wire data
//!
//! This module defines [`Value`], the dynamic value tree produced when no
//! static target type is known, plus the small leaf types shared by all
//! codecs ([`Module`], [`Bytes`], [`StreamToken`]).
//!
//! ## Wire Types
//!
//! | Variant | Wire form |
//! |---------|-----------|
//! | `Null` | `null` |
//! | `Bool` | `true` / `false` |
//! | `Int` | `{"@int":"..."}` |
//! | `Long` | `{"@long":"..."}` |
//! | `Double` | `{"@double":"..."}` |
//! | `String` | `"..."` |
//! | `Bytes` | `{"@bytes":"<base64>"}` |
//! | `Date` | `{"@date":"yyyy-MM-dd"}` |
//! | `Time` | `{"@time":"<RFC3339 UTC>"}` |
//! | `Module` | `{"@mod":"..."}` |
//! | `Stream` | `{"@stream":"..."}` |
//! | `Array` | `[...]` |
//! | `Object` | `{...}` or `{"@object":{...}}` |
//! | `Page` | `{"@set":{...}}` |
//! | documents | `{"@doc":{...}}` / `{"@ref":{...}}` |
//!
//! Different variants are never equal: `Int(1) != Long(1)`.
//!
//! ## Serde
//!
//! The serde derives give these types serde's default externally tagged
//! form (`{"Long":10}`), for caching and logging inside an application.
//! That form is not the database wire format and the server never reads
//! it; go through the codec layer for anything sent or received.

use crate::document::{Document, DocumentRef, NamedDocument, NamedDocumentRef, NullDocument};
use crate::page::Page;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A named database module, typically a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Module {
    name: String,
}

impl Module {
    /// Create a module reference by name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The module name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Binary payload transported as `@bytes`
///
/// A newtype so that a byte payload is never confused with an array of
/// small integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Borrow the raw bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the raw bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Bytes(v.to_vec())
    }
}

/// Opaque token identifying an event source, transported as `@stream`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamToken(pub String);

impl StreamToken {
    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Dynamic wire value
///
/// Produced by the dynamic codec for untyped data: document data bags,
/// queries without a declared response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer (`@int`)
    Int(i32),
    /// 64-bit integer (`@long`)
    Long(i64),
    /// 64-bit float (`@double`)
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Binary data (`@bytes`)
    Bytes(Vec<u8>),
    /// Calendar date (`@date`)
    Date(NaiveDate),
    /// Instant in UTC (`@time`)
    Time(DateTime<Utc>),
    /// Module reference (`@mod`)
    Module(Module),
    /// Event source token (`@stream`)
    Stream(StreamToken),
    /// Ordered sequence
    Array(Vec<Value>),
    /// String-keyed map
    Object(HashMap<String, Value>),
    /// Paginated set
    Page(Page<Value>),
    /// Document addressed by id
    Document(Document),
    /// Document addressed by name
    NamedDocument(NamedDocument),
    /// Reference by id
    Ref(DocumentRef),
    /// Reference by name
    NamedRef(NamedDocumentRef),
    /// Reference to a document that does not exist
    NullDocument(NullDocument),
}

impl Value {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Long(_) => "Long",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::Module(_) => "Module",
            Value::Stream(_) => "Stream",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Page(_) => "Page",
            Value::Document(_) => "Document",
            Value::NamedDocument(_) => "NamedDocument",
            Value::Ref(_) => "Ref",
            Value::NamedRef(_) => "NamedRef",
            Value::NullDocument(_) => "NullDocument",
        }
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64, widening `Int`
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as array slice
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to get as object reference
    pub fn as_object(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Look up a field of an object or a document's data
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(o) => o.get(key),
            Value::Document(d) => d.data.get(key),
            Value::NamedDocument(d) => d.data.get(key),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b.0)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<Module> for Value {
    fn from(m: Module) -> Self {
        Value::Module(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(o: HashMap<String, Value>) -> Self {
        Value::Object(o)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<DocumentRef> for Value {
    fn from(r: DocumentRef) -> Self {
        Value::Ref(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod type_name_tests {
        use super::*;

        #[test]
        fn test_integer_widths_have_distinct_names() {
            assert_eq!(Value::Int(1).type_name(), "Int");
            assert_eq!(Value::Long(1).type_name(), "Long");
        }

        #[test]
        fn test_document_shapes_have_distinct_names() {
            let coll = Module::new("Foo");
            let names = [
                Value::Ref(DocumentRef::new("1", coll.clone())).type_name(),
                Value::NamedRef(NamedDocumentRef::new("n", coll)).type_name(),
            ];
            assert_eq!(names, ["Ref", "NamedRef"]);
        }
    }

    mod equality_tests {
        use super::*;

        #[test]
        fn test_int_not_equal_long() {
            assert_ne!(Value::Int(1), Value::Long(1));
        }

        #[test]
        fn test_nan_not_equal_nan() {
            assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        }

        #[test]
        fn test_string_not_equal_bytes() {
            assert_ne!(Value::String("abc".into()), Value::Bytes(b"abc".to_vec()));
        }
    }

    mod accessor_tests {
        use super::*;

        #[test]
        fn test_as_long_widens_int() {
            assert_eq!(Value::Int(7).as_long(), Some(7));
            assert_eq!(Value::Long(i64::MAX).as_long(), Some(i64::MAX));
            assert_eq!(Value::Double(1.0).as_long(), None);
        }

        #[test]
        fn test_as_double_widens_integers() {
            assert_eq!(Value::Int(2).as_double(), Some(2.0));
            assert_eq!(Value::Long(3).as_double(), Some(3.0));
            assert_eq!(Value::String("x".into()).as_double(), None);
        }

        #[test]
        fn test_get_reads_objects_and_documents() {
            let mut map = HashMap::new();
            map.insert("a".to_string(), Value::Bool(true));
            assert_eq!(Value::Object(map).get("a"), Some(&Value::Bool(true)));
            assert_eq!(Value::Int(1).get("a"), None);
        }

        #[test]
        fn test_option_conversion() {
            assert_eq!(Value::from(None::<i32>), Value::Null);
            assert_eq!(Value::from(Some("x")), Value::String("x".into()));
        }
    }

    mod module_tests {
        use super::*;

        #[test]
        fn test_module_display() {
            let m = Module::new("Products");
            assert_eq!(m.name(), "Products");
            assert_eq!(m.to_string(), "Products");
        }

        #[test]
        fn test_serde_roundtrip() {
            let m = Module::new("Products");
            let json = serde_json::to_string(&m).unwrap();
            let back: Module = serde_json::from_str(&json).unwrap();
            assert_eq!(back, m);
        }

        #[test]
        fn test_serde_form_is_not_tagged_wire() {
            let v = Value::Array(vec![Value::Long(10), Value::Module(Module::new("Users"))]);
            let json = serde_json::to_string(&v).unwrap();
            assert_eq!(json, r#"{"Array":[{"Long":10},{"Module":{"name":"Users"}}]}"#);
            assert!(!json.contains("@long"));
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(back, v);
        }

        #[test]
        fn test_serde_keeps_unmaterialized_pages() {
            let page: Page<i32> = Page::unmaterialized("c");
            let json = serde_json::to_string(&page).unwrap();
            let back: Page<i32> = serde_json::from_str(&json).unwrap();
            assert!(!back.is_materialized());

            let old: Page<i32> = serde_json::from_str(r#"{"data":[1],"after":null}"#).unwrap();
            assert!(old.is_materialized());
        }
    }
}
