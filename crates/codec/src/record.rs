//! Record (struct) codecs built from explicit field descriptors
//!
//! A type implements [`Record`] to list its fields once:
//!
//! ```
//! use docwire_codec::{record_codec, Codable, Codec, CodecProvider, FieldSet, Record};
//! use docwire_core::CodecResult;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Record for Person {
//!     fn describe(fields: &mut FieldSet<'_, Self>) {
//!         fields
//!             .field("name", |p| &p.name, |p| &mut p.name)
//!             .field("age", |p| &p.age, |p| &mut p.age);
//!     }
//! }
//!
//! impl Codable for Person {
//!     fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
//!         record_codec::<Self>(provider)
//!     }
//! }
//! ```
//!
//! Decoding starts from `R::default()` and assigns fields as they appear.
//! Unknown wire fields are skipped. Inside a `@doc` or `@ref` payload the
//! `exists`/`cause` fields are honoured: `"exists": false` raises the
//! null-document condition.

use crate::codec::{advance, unsupported, Codable, Codec};
use crate::document::DocumentFields;
use crate::registry::CodecProvider;
use docwire_core::{CodecError, CodecResult};
use docwire_wire::{tags, TaggedReader, TaggedWriter, Token, WireType};
use rustc_hash::FxHashMap;
use std::sync::Arc;

const RECORD_TYPES: &[WireType] = &[WireType::Object, WireType::Document, WireType::Ref];

/// Role of a record field in document metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Ordinary data field
    Plain,
    /// Document id; encoded only when the client generates it
    Id {
        /// Whether the client supplies the id on create
        client_generated: bool,
    },
    /// Document timestamp; decoded, never encoded
    Ts,
    /// Owning collection; decoded, never encoded
    Coll,
}

impl FieldKind {
    fn is_encoded(&self) -> bool {
        match self {
            FieldKind::Plain => true,
            FieldKind::Id { client_generated } => *client_generated,
            FieldKind::Ts | FieldKind::Coll => false,
        }
    }
}

/// Static description of a record type
pub trait Record: Default + Send + Sync + 'static {
    /// Declare the record's fields
    fn describe(fields: &mut FieldSet<'_, Self>);
}

trait FieldAccess<R>: Send + Sync {
    fn wire_name(&self) -> &'static str;
    fn kind(&self) -> FieldKind;
    fn decode_into(&self, reader: &mut TaggedReader<'_>, record: &mut R) -> CodecResult<()>;
    fn encode_from(&self, writer: &mut TaggedWriter, record: &R) -> CodecResult<()>;
}

struct TypedField<R, F> {
    wire_name: &'static str,
    kind: FieldKind,
    codec: Arc<dyn Codec<F>>,
    get: fn(&R) -> &F,
    get_mut: fn(&mut R) -> &mut F,
}

impl<R, F> FieldAccess<R> for TypedField<R, F> {
    fn wire_name(&self) -> &'static str {
        self.wire_name
    }

    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn decode_into(&self, reader: &mut TaggedReader<'_>, record: &mut R) -> CodecResult<()> {
        *(self.get_mut)(record) = self.codec.decode(reader)?;
        Ok(())
    }

    fn encode_from(&self, writer: &mut TaggedWriter, record: &R) -> CodecResult<()> {
        self.codec.encode(writer, (self.get)(record))
    }
}

/// Builder handed to [`Record::describe`]
pub struct FieldSet<'p, R> {
    provider: &'p CodecProvider,
    fields: Vec<Box<dyn FieldAccess<R>>>,
    error: Option<CodecError>,
}

impl<'p, R: Record> FieldSet<'p, R> {
    fn new(provider: &'p CodecProvider) -> Self {
        FieldSet {
            provider,
            fields: Vec::new(),
            error: None,
        }
    }

    /// Declare a data field; its codec is resolved through the provider
    pub fn field<F: Codable>(
        &mut self,
        wire_name: &'static str,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> &mut Self {
        self.field_of_kind(FieldKind::Plain, wire_name, get, get_mut)
    }

    /// Declare the document id field
    pub fn id<F: Codable>(
        &mut self,
        wire_name: &'static str,
        client_generated: bool,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> &mut Self {
        self.field_of_kind(FieldKind::Id { client_generated }, wire_name, get, get_mut)
    }

    /// Declare the document timestamp field
    pub fn ts<F: Codable>(
        &mut self,
        wire_name: &'static str,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> &mut Self {
        self.field_of_kind(FieldKind::Ts, wire_name, get, get_mut)
    }

    /// Declare the owning-collection field
    pub fn coll<F: Codable>(
        &mut self,
        wire_name: &'static str,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> &mut Self {
        self.field_of_kind(FieldKind::Coll, wire_name, get, get_mut)
    }

    /// Declare a field of any kind with a provider-resolved codec
    pub fn field_of_kind<F: Codable>(
        &mut self,
        kind: FieldKind,
        wire_name: &'static str,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        match self.provider.get::<F>() {
            Ok(codec) => self.push(kind, wire_name, codec, get, get_mut),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Declare a data field with an explicit codec instead of the provider's
    pub fn field_with<F: Send + Sync + 'static>(
        &mut self,
        wire_name: &'static str,
        codec: Arc<dyn Codec<F>>,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) -> &mut Self {
        if self.error.is_none() {
            self.push(FieldKind::Plain, wire_name, codec, get, get_mut);
        }
        self
    }

    fn push<F: Send + Sync + 'static>(
        &mut self,
        kind: FieldKind,
        wire_name: &'static str,
        codec: Arc<dyn Codec<F>>,
        get: fn(&R) -> &F,
        get_mut: fn(&mut R) -> &mut F,
    ) {
        if self.fields.iter().any(|f| f.wire_name() == wire_name) {
            self.error = Some(CodecError::resolution(
                std::any::type_name::<R>(),
                format!("field `{}` declared twice", wire_name),
            ));
            return;
        }
        if kind != FieldKind::Plain && self.fields.iter().any(|f| f.kind() == kind) {
            self.error = Some(CodecError::resolution(
                std::any::type_name::<R>(),
                format!("more than one {:?} field", kind),
            ));
            return;
        }
        self.fields.push(Box::new(TypedField {
            wire_name,
            kind,
            codec,
            get,
            get_mut,
        }));
    }
}

/// Codec for a [`Record`] type
pub struct RecordCodec<R> {
    name: &'static str,
    fields: Vec<Box<dyn FieldAccess<R>>>,
    index: FxHashMap<&'static str, usize>,
    escaped: bool,
}

impl<R: Record> RecordCodec<R> {
    /// Build from the record's descriptor
    pub fn build(provider: &CodecProvider) -> CodecResult<Self> {
        let mut set = FieldSet::<R>::new(provider);
        R::describe(&mut set);
        if let Some(e) = set.error {
            return Err(e);
        }
        let fields = set.fields;
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.wire_name(), i))
            .collect();
        let escaped = tags::any_reserved(fields.iter().map(|f| f.wire_name()));
        let full = std::any::type_name::<R>();
        Ok(RecordCodec {
            name: full.rsplit("::").next().unwrap_or(full),
            fields,
            index,
            escaped,
        })
    }

    /// Number of declared fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record encodes in the `@object` escaped form
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    fn in_context(&self, field: &str, err: CodecError) -> CodecError {
        match err {
            CodecError::Decode { message } => CodecError::decode(format!(
                "{} (field `{}` of {})",
                message, field, self.name
            )),
            other => other,
        }
    }
}

impl<R: Record> Codec<R> for RecordCodec<R> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<R> {
        let end = match reader.current_token() {
            Token::StartObject => Token::EndObject,
            Token::StartDocument => Token::EndDocument,
            Token::StartRef => Token::EndRef,
            other => return Err(unsupported(self.name, other, RECORD_TYPES)),
        };
        let in_document = end != Token::EndObject;
        let mut record = R::default();
        let mut meta = DocumentFields::default();

        loop {
            advance(reader)?;
            let token = reader.current_token();
            if token == end {
                break;
            }
            if token != Token::FieldName {
                return Err(CodecError::decode(format!(
                    "expected field name in {}, got {}",
                    self.name, token
                )));
            }
            let name = reader.field_name()?.to_string();
            advance(reader)?;
            let slot = self.index.get(name.as_str()).copied();

            if in_document {
                let token = reader.current_token();
                match name.as_str() {
                    "id" if token == Token::String => meta.id = Some(reader.value_as_string()?),
                    "name" if token == Token::String => meta.name = Some(reader.value_as_string()?),
                    "coll" if token == Token::Module => meta.coll = Some(reader.value_as_module()?),
                    "exists" if slot.is_none() => {
                        meta.exists = Some(reader.value_as_boolean()?);
                        continue;
                    }
                    "cause" if slot.is_none() => {
                        meta.cause = Some(reader.value_as_string()?);
                        continue;
                    }
                    _ => {}
                }
            }

            match slot {
                Some(i) => self.fields[i]
                    .decode_into(reader, &mut record)
                    .map_err(|e| self.in_context(&name, e))?,
                None => reader.skip()?,
            }
        }

        if let Some(null) = meta.null_document()? {
            return Err(CodecError::NullDocument(null));
        }
        Ok(record)
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &R) -> CodecResult<()> {
        if self.escaped {
            writer.start_escaped_object();
        } else {
            writer.start_object();
        }
        for field in self.fields.iter().filter(|f| f.kind().is_encoded()) {
            writer.write_field_name(field.wire_name());
            field.encode_from(writer, value)?;
        }
        if self.escaped {
            writer.end_escaped_object();
        } else {
            writer.end_object();
        }
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        RECORD_TYPES
    }
}

/// Build the codec for a [`Record`], for use in [`Codable::build_codec`]
pub fn record_codec<R: Record>(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<R>>> {
    Ok(Arc::new(RecordCodec::<R>::build(provider)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_str, encode_to_string};
    use chrono::{DateTime, Utc};
    use docwire_core::{DocumentKey, DocumentRef, Module, NullableDocument};

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: Option<String>,
        coll: Option<Module>,
        ts: Option<DateTime<Utc>>,
        first_name: String,
        age: i32,
        tags: Vec<String>,
    }

    impl Record for Person {
        fn describe(fields: &mut FieldSet<'_, Self>) {
            fields
                .id("id", false, |p| &p.id, |p| &mut p.id)
                .coll("coll", |p| &p.coll, |p| &mut p.coll)
                .ts("ts", |p| &p.ts, |p| &mut p.ts)
                .field("first_name", |p| &p.first_name, |p| &mut p.first_name)
                .field("age", |p| &p.age, |p| &mut p.age)
                .field("tags", |p| &p.tags, |p| &mut p.tags);
        }
    }

    impl Codable for Person {
        fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
            record_codec::<Self>(provider)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Tagged {
        int_field: String,
    }

    impl Record for Tagged {
        fn describe(fields: &mut FieldSet<'_, Self>) {
            fields.field("@int", |t| &t.int_field, |t| &mut t.int_field);
        }
    }

    impl Codable for Tagged {
        fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
            record_codec::<Self>(provider)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Tree {
        label: String,
        children: Vec<Tree>,
    }

    impl Record for Tree {
        fn describe(fields: &mut FieldSet<'_, Self>) {
            fields
                .field("label", |t| &t.label, |t| &mut t.label)
                .field("children", |t| &t.children, |t| &mut t.children);
        }
    }

    impl Codable for Tree {
        fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
            record_codec::<Self>(provider)
        }
    }

    #[derive(Debug, Default)]
    struct Twice {
        a: i32,
    }

    impl Record for Twice {
        fn describe(fields: &mut FieldSet<'_, Self>) {
            fields
                .field("a", |t| &t.a, |t| &mut t.a)
                .field("a", |t| &t.a, |t| &mut t.a);
        }
    }

    impl Codable for Twice {
        fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
            record_codec::<Self>(provider)
        }
    }

    #[derive(Debug, Default)]
    struct Order {
        id: Option<String>,
        label: String,
        owner: Option<DocumentRef>,
        buyer: Option<NullableDocument<DocumentRef>>,
        qty: i32,
    }

    impl Record for Order {
        fn describe(fields: &mut FieldSet<'_, Self>) {
            fields
                .id("id", false, |o| &o.id, |o| &mut o.id)
                .field("label", |o| &o.label, |o| &mut o.label)
                .field("owner", |o| &o.owner, |o| &mut o.owner)
                .field("buyer", |o| &o.buyer, |o| &mut o.buyer)
                .field("qty", |o| &o.qty, |o| &mut o.qty);
        }
    }

    impl Codable for Order {
        fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
            record_codec::<Self>(provider)
        }
    }

    fn provider() -> CodecProvider {
        CodecProvider::new()
    }

    // === Decode ===

    #[test]
    fn test_plain_object_decode() {
        let wire = r#"{"first_name":"Alice","age":{"@int":"30"},"tags":["a"]}"#;
        let p: Person = decode_str(&provider(), wire).unwrap();
        assert_eq!(p.first_name, "Alice");
        assert_eq!(p.age, 30);
        assert_eq!(p.tags, vec!["a".to_string()]);
        assert_eq!(p.id, None);
    }

    #[test]
    fn test_unknown_fields_skipped_with_subtrees() {
        let wire = r#"{"first_name":"Bob","extra":{"deep":[{"@object":{"@int":"x"}},[1,[2]]]},"age":{"@int":"4"},"more":{"@set":"c"}}"#;
        let p: Person = decode_str(&provider(), wire).unwrap();
        assert_eq!(p.first_name, "Bob");
        assert_eq!(p.age, 4);
    }

    #[test]
    fn test_document_metadata_fields() {
        let wire = r#"{"@doc":{"id":"7","coll":{"@mod":"People"},"ts":{"@time":"2023-12-03T14:52:10Z"},"first_name":"Eve"}}"#;
        let p: Person = decode_str(&provider(), wire).unwrap();
        assert_eq!(p.id.as_deref(), Some("7"));
        assert_eq!(p.coll, Some(Module::new("People")));
        assert!(p.ts.is_some());
        assert_eq!(p.first_name, "Eve");
    }

    #[test]
    fn test_record_in_missing_document() {
        let wire = r#"{"@ref":{"id":"123","coll":{"@mod":"Foo"},"exists":false,"cause":"deleted"}}"#;
        let err = decode_str::<Person>(&provider(), wire).unwrap_err();
        assert!(err.is_null_document());

        let nullable: NullableDocument<Person> = decode_str(&provider(), wire).unwrap();
        assert_eq!(nullable.null_document().unwrap().cause, "deleted");
    }

    const MISSING_USER: &str =
        r#"{"@ref":{"id":"9","coll":{"@mod":"Users"},"exists":false,"cause":"deleted"}}"#;

    #[test]
    fn test_missing_nested_ref_is_not_the_enclosing_document() {
        let wire = format!(
            r#"{{"@doc":{{"id":"1","coll":{{"@mod":"Orders"}},"label":"pens","owner":{},"qty":{{"@int":"2"}}}}}}"#,
            MISSING_USER
        );
        let err = decode_str::<NullableDocument<Order>>(&provider(), &wire).unwrap_err();
        match err {
            CodecError::NullDocument(null) => {
                assert_eq!(null.key, DocumentKey::Id("9".into()));
                assert_eq!(null.coll, Module::new("Users"));
            }
            other => panic!("expected null document, got {:?}", other),
        }

        let listed = format!("[{}]", wire);
        let err = decode_str::<Vec<NullableDocument<Order>>>(&provider(), &listed).unwrap_err();
        assert!(err.is_null_document(), "{err}");
    }

    #[test]
    fn test_nullable_field_absorbs_missing_nested_ref() {
        let order = format!(
            r#"{{"@doc":{{"id":"1","coll":{{"@mod":"Orders"}},"label":"pens","buyer":{},"qty":{{"@int":"2"}}}}}}"#,
            MISSING_USER
        );
        let missing = r#"{"@ref":{"id":"2","coll":{"@mod":"Orders"},"exists":false,"cause":"not found"}}"#;
        let wire = format!("[{},{}]", order, missing);

        let got: Vec<NullableDocument<Order>> = decode_str(&provider(), &wire).unwrap();
        assert_eq!(got.len(), 2);
        match &got[0] {
            NullableDocument::Present(o) => {
                assert_eq!(o.id.as_deref(), Some("1"));
                assert_eq!(o.qty, 2);
                let buyer = o.buyer.as_ref().and_then(|b| b.null_document()).unwrap();
                assert_eq!(buyer.key, DocumentKey::Id("9".into()));
            }
            other => panic!("expected present order, got {:?}", other),
        }
        let null = got[1].null_document().unwrap();
        assert_eq!(null.key, DocumentKey::Id("2".into()));
        assert_eq!(null.coll, Module::new("Orders"));
    }

    #[test]
    fn test_field_error_names_record_and_field() {
        let err = decode_str::<Person>(&provider(), r#"{"age":"thirty"}"#).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("field `age` of Person"), "{msg}");
        assert!(msg.contains("`String` with `Int`"), "{msg}");
    }

    #[test]
    fn test_record_rejects_array() {
        assert!(decode_str::<Person>(&provider(), "[]").is_err());
    }

    // === Encode ===

    #[test]
    fn test_server_fields_not_encoded() {
        let p = Person {
            id: Some("7".to_string()),
            coll: Some(Module::new("People")),
            ts: None,
            first_name: "Eve".to_string(),
            age: 3,
            tags: vec![],
        };
        assert_eq!(
            encode_to_string(&provider(), &p).unwrap(),
            r#"{"first_name":"Eve","age":{"@int":"3"},"tags":[]}"#
        );
    }

    #[test]
    fn test_reserved_field_name_escapes() {
        let prov = provider();
        let t = Tagged {
            int_field: "not".to_string(),
        };
        let wire = encode_to_string(&prov, &t).unwrap();
        assert_eq!(wire, r#"{"@object":{"@int":"not"}}"#);
        assert_eq!(decode_str::<Tagged>(&prov, &wire).unwrap(), t);
    }

    // === Resolution ===

    #[test]
    fn test_recursive_record() {
        let prov = provider();
        let wire = r#"{"label":"root","children":[{"label":"leaf","children":[]}]}"#;
        let tree: Tree = decode_str(&prov, wire).unwrap();
        assert_eq!(tree.children[0].label, "leaf");
        assert_eq!(encode_to_string(&prov, &tree).unwrap(), wire);
    }

    #[test]
    fn test_duplicate_field_is_resolution_error() {
        let err = provider().get::<Twice>().err().unwrap();
        assert!(matches!(err, CodecError::Resolution { .. }));
    }

    #[test]
    fn test_failed_resolution_not_cached() {
        let prov = provider();
        assert!(prov.get::<Twice>().is_err());
        assert!(!prov.registry().contains::<Twice>());
    }
}
