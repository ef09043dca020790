//! Dynamic codec
//!
//! Decodes without a static target by dispatching on the current token, and
//! encodes by matching on the closed [`Value`] enum. Used for document data
//! bags and for queries with no declared result type.

use crate::codec::{advance, Codable, Codec};
use crate::document::{read_document, write_ref};
use crate::page::{read_page_body, write_page};
use crate::registry::CodecProvider;
use docwire_core::{CodecError, CodecResult, DocumentKey, StreamToken, Value};
use docwire_wire::{tags, TaggedReader, TaggedWriter, Token, WireType};
use std::collections::HashMap;
use std::sync::Arc;

const ALL_TYPES: &[WireType] = &[
    WireType::Null,
    WireType::Boolean,
    WireType::Int,
    WireType::Long,
    WireType::Double,
    WireType::String,
    WireType::Bytes,
    WireType::Date,
    WireType::Time,
    WireType::Module,
    WireType::Stream,
    WireType::Array,
    WireType::Object,
    WireType::Set,
    WireType::Document,
    WireType::Ref,
];

/// Decode the value at the reader's current token.
///
/// A reference to a nonexistent document becomes [`Value::NullDocument`]
/// instead of failing the enclosing value.
pub fn decode_value(reader: &mut TaggedReader<'_>) -> CodecResult<Value> {
    let value = match reader.current_token() {
        Token::Null => Value::Null,
        Token::True => Value::Bool(true),
        Token::False => Value::Bool(false),
        Token::String => Value::String(reader.value_as_string()?),
        Token::Int => Value::Int(reader.value_as_int()?),
        Token::Long => Value::Long(reader.value_as_long()?),
        Token::Double => Value::Double(reader.value_as_double()?),
        Token::Date => Value::Date(reader.value_as_local_date()?),
        Token::Time => Value::Time(reader.value_as_time()?),
        Token::Bytes => Value::Bytes(reader.value_as_byte_array()?),
        Token::Module => Value::Module(reader.value_as_module()?),
        Token::Stream => Value::Stream(reader.value_as_stream()?),
        Token::StartArray => Value::Array(decode_array(reader)?),
        Token::StartObject => Value::Object(decode_object(reader)?),
        Token::StartPage => Value::Page(read_page_body(reader, decode_value)?),
        Token::StartDocument | Token::StartRef => match read_document(reader) {
            Ok(shape) => shape.into_value(),
            Err(CodecError::NullDocument(null)) => Value::NullDocument(null),
            Err(e) => return Err(e),
        },
        other => {
            return Err(CodecError::decode(format!(
                "cannot decode a value starting at {}",
                other
            )))
        }
    };
    Ok(value)
}

fn decode_array(reader: &mut TaggedReader<'_>) -> CodecResult<Vec<Value>> {
    let mut items = Vec::new();
    loop {
        advance(reader)?;
        if reader.current_token() == Token::EndArray {
            return Ok(items);
        }
        items.push(decode_value(reader)?);
    }
}

fn decode_object(reader: &mut TaggedReader<'_>) -> CodecResult<HashMap<String, Value>> {
    let mut map = HashMap::new();
    loop {
        advance(reader)?;
        match reader.current_token() {
            Token::EndObject => return Ok(map),
            Token::FieldName => {
                let key = reader.field_name()?.to_string();
                advance(reader)?;
                map.insert(key, decode_value(reader)?);
            }
            other => {
                return Err(CodecError::decode(format!(
                    "expected field name or end of object, got {}",
                    other
                )))
            }
        }
    }
}

/// Encode any [`Value`].
///
/// Documents and null documents go out as `@ref`.
pub fn encode_value(writer: &mut TaggedWriter, value: &Value) -> CodecResult<()> {
    match value {
        Value::Null => writer.write_null(),
        Value::Bool(b) => writer.write_boolean(*b),
        Value::Int(i) => writer.write_int(*i),
        Value::Long(l) => writer.write_long(*l),
        Value::Double(d) => writer.write_double(*d),
        Value::String(s) => writer.write_string(s),
        Value::Bytes(b) => writer.write_bytes(b),
        Value::Date(d) => writer.write_date(*d),
        Value::Time(t) => writer.write_time(t),
        Value::Module(m) => writer.write_module(m),
        Value::Stream(StreamToken(token)) => writer.write_stream(token),
        Value::Array(items) => {
            writer.start_array();
            for item in items {
                encode_value(writer, item)?;
            }
            writer.end_array();
        }
        Value::Object(map) => encode_object(writer, map)?,
        Value::Page(page) => write_page(writer, page, encode_value)?,
        Value::Document(doc) => write_ref(writer, &DocumentKey::Id(doc.id.clone()), &doc.coll),
        Value::NamedDocument(doc) => {
            write_ref(writer, &DocumentKey::Name(doc.name.clone()), &doc.coll)
        }
        Value::Ref(r) => write_ref(writer, &DocumentKey::Id(r.id.clone()), &r.coll),
        Value::NamedRef(r) => write_ref(writer, &DocumentKey::Name(r.name.clone()), &r.coll),
        Value::NullDocument(null) => write_ref(writer, &null.key, &null.coll),
    }
    Ok(())
}

fn encode_object(writer: &mut TaggedWriter, map: &HashMap<String, Value>) -> CodecResult<()> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(k, _)| *k);

    let escaped = tags::any_reserved(entries.iter().map(|(k, _)| k.as_str()));
    if escaped {
        writer.start_escaped_object();
    } else {
        writer.start_object();
    }
    for (key, item) in entries {
        writer.write_field_name(key);
        encode_value(writer, item)?;
    }
    if escaped {
        writer.end_escaped_object();
    } else {
        writer.end_object();
    }
    Ok(())
}

/// Codec for [`Value`]
pub struct DynamicCodec;

impl Codec<Value> for DynamicCodec {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<Value> {
        decode_value(reader)
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &Value) -> CodecResult<()> {
        encode_value(writer, value)
    }

    fn supported_types(&self) -> &[WireType] {
        ALL_TYPES
    }
}

impl Codable for Value {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(DynamicCodec))
    }
}
