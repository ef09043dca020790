//! Document and reference codecs
//!
//! `@doc` and `@ref` payloads share one shape: an id or name, a collection,
//! optionally a timestamp, and user data. The accumulator captures the
//! metadata fields into slots, sends everything else through the dynamic
//! codec into a data bag, and classifies the result at the end token.
//!
//! A payload with `"exists": false` never yields a normal value; it raises
//! [`CodecError::NullDocument`].
//!
//! Every member of the family encodes as a `@ref` carrying only the key and
//! collection.

use crate::codec::{advance, unsupported, Codable, Codec};
use crate::dynamic::decode_value;
use crate::registry::CodecProvider;
use chrono::{DateTime, Utc};
use docwire_core::{
    CodecError, CodecResult, Document, DocumentKey, DocumentRef, Module, NamedDocument,
    NamedDocumentRef, NullDocument, Value,
};
use docwire_wire::{TaggedReader, TaggedWriter, Token, WireType};
use std::collections::HashMap;
use std::sync::Arc;

/// Wire types a document-family codec accepts
pub(crate) const DOCUMENT_TYPES: &[WireType] = &[WireType::Document, WireType::Ref];

/// Metadata slots plus the data bag of one `@doc`/`@ref` payload
#[derive(Debug, Default)]
pub(crate) struct DocumentFields {
    pub id: Option<String>,
    pub name: Option<String>,
    pub coll: Option<Module>,
    pub ts: Option<DateTime<Utc>>,
    pub exists: Option<bool>,
    pub cause: Option<String>,
    pub data: HashMap<String, Value>,
}

/// What a payload turned out to be
#[derive(Debug)]
pub(crate) enum DocumentShape {
    Document(Document),
    Named(NamedDocument),
    Ref(DocumentRef),
    NamedRef(NamedDocumentRef),
    /// Unrecognised shape: all fields merged into one map
    Other(HashMap<String, Value>),
}

impl DocumentShape {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            DocumentShape::Document(_) => "Document",
            DocumentShape::Named(_) => "NamedDocument",
            DocumentShape::Ref(_) => "Ref",
            DocumentShape::NamedRef(_) => "NamedRef",
            DocumentShape::Other(_) => "Object",
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            DocumentShape::Document(d) => Value::Document(d),
            DocumentShape::Named(d) => Value::NamedDocument(d),
            DocumentShape::Ref(r) => Value::Ref(r),
            DocumentShape::NamedRef(r) => Value::NamedRef(r),
            DocumentShape::Other(map) => Value::Object(map),
        }
    }
}

impl DocumentFields {
    /// Consume fields up to the end token matching the current start token
    pub(crate) fn read(reader: &mut TaggedReader<'_>) -> CodecResult<Self> {
        let end = match reader.current_token() {
            Token::StartDocument => Token::EndDocument,
            Token::StartRef => Token::EndRef,
            other => return Err(unsupported("Document", other, DOCUMENT_TYPES)),
        };

        let mut fields = DocumentFields::default();
        loop {
            advance(reader)?;
            let token = reader.current_token();
            if token == end {
                return Ok(fields);
            }
            if token != Token::FieldName {
                return Err(CodecError::decode(format!(
                    "expected field name in document, got {}",
                    token
                )));
            }
            let name = reader.field_name()?.to_string();
            advance(reader)?;
            match name.as_str() {
                "id" => fields.id = Some(reader.value_as_string()?),
                "name" => fields.name = Some(reader.value_as_string()?),
                "coll" => fields.coll = Some(reader.value_as_module()?),
                "ts" => fields.ts = Some(reader.value_as_time()?),
                "exists" => fields.exists = Some(reader.value_as_boolean()?),
                "cause" => fields.cause = Some(reader.value_as_string()?),
                _ => {
                    let value = decode_value(reader)?;
                    fields.data.insert(name, value);
                }
            }
        }
    }

    /// The null document this payload asserts, if `exists` is false
    pub(crate) fn null_document(&self) -> CodecResult<Option<NullDocument>> {
        if self.exists != Some(false) {
            return Ok(None);
        }
        let key = match (&self.id, &self.name) {
            (Some(id), _) => DocumentKey::Id(id.clone()),
            (None, Some(name)) => DocumentKey::Name(name.clone()),
            (None, None) => {
                return Err(CodecError::decode(
                    "nonexistent document reference has neither id nor name",
                ))
            }
        };
        let coll = self.coll.clone().ok_or_else(|| {
            CodecError::decode("nonexistent document reference has no collection")
        })?;
        Ok(Some(NullDocument::new(
            key,
            coll,
            self.cause.clone().unwrap_or_default(),
        )))
    }

    /// Classify the payload, raising the null-document condition first
    pub(crate) fn into_shape(self) -> CodecResult<DocumentShape> {
        if let Some(null) = self.null_document()? {
            return Err(CodecError::NullDocument(null));
        }
        let DocumentFields {
            id,
            name,
            coll,
            ts,
            exists,
            cause,
            mut data,
        } = self;

        Ok(match (id, name, coll, ts) {
            (Some(id), name, Some(coll), Some(ts)) => {
                if let Some(name) = name {
                    data.insert("name".to_string(), Value::String(name));
                }
                DocumentShape::Document(Document { id, coll, ts, data })
            }
            (Some(id), None, Some(coll), None) => DocumentShape::Ref(DocumentRef { id, coll }),
            (None, Some(name), Some(coll), Some(ts)) => {
                DocumentShape::Named(NamedDocument { name, coll, ts, data })
            }
            (None, Some(name), Some(coll), None) => {
                DocumentShape::NamedRef(NamedDocumentRef { name, coll })
            }
            (id, name, coll, ts) => {
                if let Some(id) = id {
                    data.insert("id".to_string(), Value::String(id));
                }
                if let Some(name) = name {
                    data.insert("name".to_string(), Value::String(name));
                }
                if let Some(coll) = coll {
                    data.insert("coll".to_string(), Value::Module(coll));
                }
                if let Some(ts) = ts {
                    data.insert("ts".to_string(), Value::Time(ts));
                }
                if let Some(exists) = exists {
                    data.insert("exists".to_string(), Value::Bool(exists));
                }
                if let Some(cause) = cause {
                    data.insert("cause".to_string(), Value::String(cause));
                }
                DocumentShape::Other(data)
            }
        })
    }
}

/// Read one `@doc`/`@ref` and classify it
pub(crate) fn read_document(reader: &mut TaggedReader<'_>) -> CodecResult<DocumentShape> {
    DocumentFields::read(reader)?.into_shape()
}

/// `{"@ref":{"id"|"name": key, "coll": {"@mod": coll}}}`
pub fn write_ref(writer: &mut TaggedWriter, key: &DocumentKey, coll: &Module) {
    writer.start_ref();
    writer.write_field_name(key.field_name());
    writer.write_string(key.as_str());
    writer.write_field_name("coll");
    writer.write_module(coll);
    writer.end_ref();
}

fn wrong_shape(expected: &str, got: &DocumentShape) -> CodecError {
    CodecError::decode(format!(
        "expected {} but wire payload decoded as {}",
        expected,
        got.kind()
    ))
}

// ============================================================================
// Typed codecs
// ============================================================================

struct DocumentCodec;

impl Codec<Document> for DocumentCodec {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<Document> {
        match read_document(reader)? {
            DocumentShape::Document(doc) => Ok(doc),
            other => Err(wrong_shape("Document", &other)),
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &Document) -> CodecResult<()> {
        write_ref(writer, &DocumentKey::Id(value.id.clone()), &value.coll);
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        DOCUMENT_TYPES
    }
}

struct NamedDocumentCodec;

impl Codec<NamedDocument> for NamedDocumentCodec {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<NamedDocument> {
        match read_document(reader)? {
            DocumentShape::Named(doc) => Ok(doc),
            other => Err(wrong_shape("NamedDocument", &other)),
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &NamedDocument) -> CodecResult<()> {
        write_ref(writer, &DocumentKey::Name(value.name.clone()), &value.coll);
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        DOCUMENT_TYPES
    }
}

/// Accepts a reference or a full document, keeping only the key
struct RefCodec;

impl Codec<DocumentRef> for RefCodec {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<DocumentRef> {
        match read_document(reader)? {
            DocumentShape::Ref(r) => Ok(r),
            DocumentShape::Document(doc) => Ok(doc.to_ref()),
            other => Err(wrong_shape("Ref", &other)),
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &DocumentRef) -> CodecResult<()> {
        write_ref(writer, &DocumentKey::Id(value.id.clone()), &value.coll);
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        DOCUMENT_TYPES
    }
}

struct NamedRefCodec;

impl Codec<NamedDocumentRef> for NamedRefCodec {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<NamedDocumentRef> {
        match read_document(reader)? {
            DocumentShape::NamedRef(r) => Ok(r),
            DocumentShape::Named(doc) => Ok(doc.to_ref()),
            other => Err(wrong_shape("NamedRef", &other)),
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &NamedDocumentRef) -> CodecResult<()> {
        write_ref(writer, &DocumentKey::Name(value.name.clone()), &value.coll);
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        DOCUMENT_TYPES
    }
}

impl Codable for Document {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(DocumentCodec))
    }
}

impl Codable for NamedDocument {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(NamedDocumentCodec))
    }
}

impl Codable for DocumentRef {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(RefCodec))
    }
}

impl Codable for NamedDocumentRef {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(NamedRefCodec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_str, encode_to_string};
    use docwire_core::NullableDocument;

    const MISSING: &str =
        r#"{"@ref":{"id":"123","coll":{"@mod":"Foo"},"exists":false,"cause":"not found"}}"#;

    fn provider() -> CodecProvider {
        CodecProvider::new()
    }

    // === Classification ===

    #[test]
    fn test_full_document() {
        let wire = r#"{"@doc":{"id":"1","coll":{"@mod":"Users"},"ts":{"@time":"2023-12-03T14:52:10.001Z"},"age":{"@int":"30"}}}"#;
        let doc: Document = decode_str(&provider(), wire).unwrap();
        assert_eq!(doc.id, "1");
        assert_eq!(doc.coll, Module::new("Users"));
        assert_eq!(doc.get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_document_name_goes_to_data() {
        let wire = r#"{"@doc":{"id":"1","name":"n","coll":{"@mod":"C"},"ts":{"@time":"2023-12-03T14:52:10Z"}}}"#;
        let doc: Document = decode_str(&provider(), wire).unwrap();
        assert_eq!(doc.get("name"), Some(&Value::String("n".to_string())));
    }

    #[test]
    fn test_named_document_and_refs() {
        let p = provider();
        let named: NamedDocument = decode_str(
            &p,
            r#"{"@doc":{"name":"Fn","coll":{"@mod":"Function"},"ts":{"@time":"2023-12-03T14:52:10Z"}}}"#,
        )
        .unwrap();
        assert_eq!(named.name, "Fn");

        let r: DocumentRef = decode_str(&p, r#"{"@ref":{"id":"9","coll":{"@mod":"Users"}}}"#).unwrap();
        assert_eq!(r, DocumentRef::new("9", Module::new("Users")));

        let nr: NamedDocumentRef =
            decode_str(&p, r#"{"@ref":{"name":"Fn","coll":{"@mod":"Function"}}}"#).unwrap();
        assert_eq!(nr, NamedDocumentRef::new("Fn", Module::new("Function")));
    }

    #[test]
    fn test_ref_codec_accepts_full_document() {
        let wire = r#"{"@doc":{"id":"1","coll":{"@mod":"Users"},"ts":{"@time":"2023-12-03T14:52:10Z"}}}"#;
        let r: DocumentRef = decode_str(&provider(), wire).unwrap();
        assert_eq!(r.id, "1");
    }

    #[test]
    fn test_document_codec_rejects_bare_ref() {
        let err = decode_str::<Document>(&provider(), r#"{"@ref":{"id":"9","coll":{"@mod":"U"}}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("decoded as Ref"));
    }

    #[test]
    fn test_unrecognised_shape_merges_slots() {
        let mut reader = TaggedReader::new(r#"{"@ref":{"id":"1","exists":true,"x":"y"}}"#);
        reader.read().unwrap();
        match read_document(&mut reader).unwrap() {
            DocumentShape::Other(map) => {
                assert_eq!(map.get("id"), Some(&Value::String("1".to_string())));
                assert_eq!(map.get("exists"), Some(&Value::Bool(true)));
                assert_eq!(map.get("x"), Some(&Value::String("y".to_string())));
            }
            other => panic!("unexpected shape {}", other.kind()),
        }
    }

    #[test]
    fn test_metadata_slot_type_checked() {
        let err = decode_str::<Document>(&provider(), r#"{"@doc":{"id":{"@int":"1"}}}"#).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    // === Null documents ===

    #[test]
    fn test_missing_document_raises_condition() {
        let err = decode_str::<Document>(&provider(), MISSING).unwrap_err();
        let null = err.into_null_document().unwrap();
        assert_eq!(null.key, DocumentKey::Id("123".to_string()));
        assert_eq!(null.coll, Module::new("Foo"));
        assert_eq!(null.cause, "not found");
    }

    #[test]
    fn test_nullable_document_yields_typed_null() {
        let got: NullableDocument<Document> = decode_str(&provider(), MISSING).unwrap();
        let null = got.null_document().unwrap();
        assert_eq!(null.key.as_str(), "123");
        assert_eq!(null.coll.name(), "Foo");
        assert_eq!(null.cause, "not found");
    }

    #[test]
    fn test_nullable_document_present() {
        let wire = r#"{"@doc":{"id":"1","coll":{"@mod":"Users"},"ts":{"@time":"2023-12-03T14:52:10Z"}}}"#;
        let got: NullableDocument<Document> = decode_str(&provider(), wire).unwrap();
        assert!(got.is_present());
    }

    #[test]
    fn test_nullable_document_rejects_wire_null() {
        assert!(decode_str::<NullableDocument<Document>>(&provider(), "null").is_err());
        let got: Option<NullableDocument<Document>> = decode_str(&provider(), "null").unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_missing_document_inside_list_aborts_list() {
        let wire = format!("[{}]", MISSING);
        let err = decode_str::<Vec<Document>>(&provider(), &wire).unwrap_err();
        assert!(err.is_null_document());
        let ok: Vec<NullableDocument<Document>> = decode_str(&provider(), &wire).unwrap();
        assert!(!ok[0].is_present());
    }

    // === Encode ===

    #[test]
    fn test_document_encodes_as_ref() {
        let p = provider();
        let ts = DateTime::parse_from_rfc3339("2023-12-03T14:52:10Z").unwrap().with_timezone(&Utc);
        let doc = Document::new("1", Module::new("Users"), ts).with_field("age", 30);
        assert_eq!(
            encode_to_string(&p, &doc).unwrap(),
            r#"{"@ref":{"id":"1","coll":{"@mod":"Users"}}}"#
        );
        let named = NamedDocumentRef::new("Fn", Module::new("Function"));
        assert_eq!(
            encode_to_string(&p, &named).unwrap(),
            r#"{"@ref":{"name":"Fn","coll":{"@mod":"Function"}}}"#
        );
    }

    #[test]
    fn test_null_document_encodes_as_ref() {
        let p = provider();
        let got: NullableDocument<DocumentRef> = decode_str(&p, MISSING).unwrap();
        assert_eq!(
            encode_to_string(&p, &got).unwrap(),
            r#"{"@ref":{"id":"123","coll":{"@mod":"Foo"}}}"#
        );
    }
}
