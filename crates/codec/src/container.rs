//! Container codecs: lists, string-keyed maps, optional and boxed values,
//! and nullable documents

use crate::codec::{advance, unsupported, Codable, Codec};
use crate::document::write_ref;
use crate::registry::{CodecKey, CodecProvider};
use docwire_core::{CodecError, CodecResult, NullableDocument};
use docwire_wire::{tags, TaggedReader, TaggedWriter, Token, WireType};
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// List
// ============================================================================

/// `[...]` of one element type
pub struct ListCodec<T> {
    element: Arc<dyn Codec<T>>,
}

impl<T> ListCodec<T> {
    /// List codec over an element codec
    pub fn new(element: Arc<dyn Codec<T>>) -> Self {
        ListCodec { element }
    }
}

impl<T> Codec<Vec<T>> for ListCodec<T> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<Vec<T>> {
        if reader.current_token() != Token::StartArray {
            return Err(unsupported("List", reader.current_token(), &[WireType::Array]));
        }
        let mut items = Vec::new();
        loop {
            advance(reader)?;
            if reader.current_token() == Token::EndArray {
                return Ok(items);
            }
            items.push(self.element.decode(reader)?);
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &Vec<T>) -> CodecResult<()> {
        writer.start_array();
        for item in value {
            self.element.encode(writer, item)?;
        }
        writer.end_array();
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        &[WireType::Array]
    }
}

impl<T: Codable> Codable for Vec<T> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<Vec<()>, T>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(ListCodec::new(provider.get::<T>()?)))
    }
}

// ============================================================================
// Map
// ============================================================================

/// A map keyed by strings that a [`MapCodec`] can fill and walk
pub trait StringMap<V>: Default + Send + Sync {
    /// Insert one decoded entry
    fn insert_entry(&mut self, key: String, value: V);

    /// Entries in wire order (sorted by key)
    fn sorted_entries(&self) -> Vec<(&str, &V)>;
}

impl<V: Send + Sync> StringMap<V> for HashMap<String, V> {
    fn insert_entry(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn sorted_entries(&self) -> Vec<(&str, &V)> {
        let mut entries: Vec<(&str, &V)> = self.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }
}

impl<V: Send + Sync> StringMap<V> for BTreeMap<String, V> {
    fn insert_entry(&mut self, key: String, value: V) {
        self.insert(key, value);
    }

    fn sorted_entries(&self) -> Vec<(&str, &V)> {
        self.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

/// String-keyed object
///
/// Encodes in the `@object` escaped form when any key is a reserved tag.
pub struct MapCodec<M, V> {
    value: Arc<dyn Codec<V>>,
    _map: PhantomData<fn() -> M>,
}

impl<M, V> MapCodec<M, V> {
    /// Map codec over a value codec
    pub fn new(value: Arc<dyn Codec<V>>) -> Self {
        MapCodec {
            value,
            _map: PhantomData,
        }
    }
}

impl<M: StringMap<V>, V> Codec<M> for MapCodec<M, V> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<M> {
        if reader.current_token() != Token::StartObject {
            return Err(unsupported("Map", reader.current_token(), &[WireType::Object]));
        }
        let mut map = M::default();
        loop {
            advance(reader)?;
            match reader.current_token() {
                Token::EndObject => return Ok(map),
                Token::FieldName => {
                    let key = reader.field_name()?.to_string();
                    advance(reader)?;
                    let value = self.value.decode(reader)?;
                    map.insert_entry(key, value);
                }
                other => {
                    return Err(CodecError::decode(format!(
                        "expected field name or end of object in map, got {}",
                        other
                    )))
                }
            }
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &M) -> CodecResult<()> {
        let entries = value.sorted_entries();
        let escaped = tags::any_reserved(entries.iter().map(|(k, _)| *k));
        if escaped {
            writer.start_escaped_object();
        } else {
            writer.start_object();
        }
        for (key, item) in entries {
            writer.write_field_name(key);
            self.value.encode(writer, item)?;
        }
        if escaped {
            writer.end_escaped_object();
        } else {
            writer.end_object();
        }
        Ok(())
    }

    fn supported_types(&self) -> &[WireType] {
        &[WireType::Object]
    }
}

impl<V: Codable> Codable for HashMap<String, V> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<HashMap<String, ()>, V>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(MapCodec::<Self, V>::new(provider.get::<V>()?)))
    }
}

impl<V: Codable> Codable for BTreeMap<String, V> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<BTreeMap<String, ()>, V>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(MapCodec::<Self, V>::new(provider.get::<V>()?)))
    }
}

// ============================================================================
// Option / Box
// ============================================================================

/// `null` decodes to `None`; anything else through the inner codec
pub struct OptionCodec<T> {
    inner: Arc<dyn Codec<T>>,
    supported: Vec<WireType>,
}

impl<T> OptionCodec<T> {
    /// Optional wrapper over an inner codec
    pub fn new(inner: Arc<dyn Codec<T>>) -> Self {
        let mut supported = vec![WireType::Null];
        supported.extend_from_slice(inner.supported_types());
        OptionCodec { inner, supported }
    }
}

impl<T> Codec<Option<T>> for OptionCodec<T> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<Option<T>> {
        if reader.current_token() == Token::Null {
            Ok(None)
        } else {
            self.inner.decode(reader).map(Some)
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &Option<T>) -> CodecResult<()> {
        match value {
            Some(inner) => self.inner.encode(writer, inner),
            None => {
                writer.write_null();
                Ok(())
            }
        }
    }

    fn supported_types(&self) -> &[WireType] {
        &self.supported
    }
}

impl<T: Codable> Codable for Option<T> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<Option<()>, T>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(OptionCodec::new(provider.get::<T>()?)))
    }
}

struct BoxCodec<T> {
    inner: Arc<dyn Codec<T>>,
}

impl<T> Codec<Box<T>> for BoxCodec<T> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<Box<T>> {
        self.inner.decode(reader).map(Box::new)
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &Box<T>) -> CodecResult<()> {
        self.inner.encode(writer, value.as_ref())
    }

    fn supported_types(&self) -> &[WireType] {
        self.inner.supported_types()
    }
}

impl<T: Codable> Codable for Box<T> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<Box<()>, T>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(BoxCodec {
            inner: provider.get::<T>()?,
        }))
    }
}

// ============================================================================
// NullableDocument
// ============================================================================

/// Turns the null-document condition into [`NullableDocument::Null`]
pub struct NullableDocumentCodec<T> {
    inner: Arc<dyn Codec<T>>,
}

impl<T> NullableDocumentCodec<T> {
    /// Nullable wrapper over a document-shaped codec
    pub fn new(inner: Arc<dyn Codec<T>>) -> Self {
        NullableDocumentCodec { inner }
    }
}

impl<T> Codec<NullableDocument<T>> for NullableDocumentCodec<T> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<NullableDocument<T>> {
        if reader.current_token() == Token::Null {
            return Err(CodecError::decode(
                "NullableDocument cannot decode `Null`; use Option<NullableDocument<_>> for nullable fields",
            ));
        }
        // The payload's own condition is raised on its closing token, after
        // its frame is popped. A nested reference raises it deeper.
        let start_depth = reader.depth();
        match self.inner.decode(reader) {
            Ok(value) => Ok(NullableDocument::Present(value)),
            Err(CodecError::NullDocument(null)) if reader.depth() < start_depth => {
                Ok(NullableDocument::Null(null))
            }
            Err(e) => Err(e),
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &NullableDocument<T>) -> CodecResult<()> {
        match value {
            NullableDocument::Present(inner) => self.inner.encode(writer, inner),
            NullableDocument::Null(null) => {
                write_ref(writer, &null.key, &null.coll);
                Ok(())
            }
        }
    }

    fn supported_types(&self) -> &[WireType] {
        self.inner.supported_types()
    }
}

impl<T: Codable> Codable for NullableDocument<T> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<NullableDocument<()>, T>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(NullableDocumentCodec::new(provider.get::<T>()?)))
    }
}
