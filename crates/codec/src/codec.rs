//! The codec abstraction
//!
//! A [`Codec<T>`] converts between `T` and the tagged wire format. Codecs are
//! stateless and shared behind `Arc`; all per-call state lives in the
//! [`TaggedReader`] or [`TaggedWriter`] passed in.
//!
//! Types opt into provider resolution by implementing [`Codable`].

use crate::registry::{CodecKey, CodecProvider};
use docwire_core::{CodecError, CodecResult};
use docwire_wire::{TaggedReader, TaggedWriter, Token, WireType};
use std::sync::Arc;

/// Encode/decode strategy for one native type
pub trait Codec<T>: Send + Sync {
    /// Decode a value starting at the reader's current token.
    ///
    /// On success the reader rests on the last token of the value (the scalar
    /// itself, or the matching end token of a container).
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<T>;

    /// Encode `value` at the writer's current position
    fn encode(&self, writer: &mut TaggedWriter, value: &T) -> CodecResult<()>;

    /// Wire types this codec accepts, for error messages
    fn supported_types(&self) -> &[WireType];
}

/// A type the [`CodecProvider`] can build a codec for
pub trait Codable: Sized + Send + Sync + 'static {
    /// Registry key for this type.
    ///
    /// Generic containers key on their raw container plus the element type.
    fn codec_key() -> CodecKey {
        CodecKey::of::<Self>()
    }

    /// Construct the codec; element codecs are resolved through `provider`
    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>>;
}

/// Decode error for a token the codec does not accept
pub(crate) fn unsupported(codec: &str, token: Token, supported: &[WireType]) -> CodecError {
    let names: Vec<&str> = supported.iter().map(|t| t.name()).collect();
    let actual = token.wire_type().map(|t| t.name()).unwrap_or_else(|| token.name());
    CodecError::unsupported_token(codec, actual, &names)
}

/// Read the next token, treating end of input as truncation
pub(crate) fn advance(reader: &mut TaggedReader<'_>) -> CodecResult<()> {
    if reader.read()? {
        Ok(())
    } else {
        Err(CodecError::UnexpectedEnd)
    }
}

/// Decode one complete value from `text`
pub fn decode_str<T: Codable>(provider: &CodecProvider, text: &str) -> CodecResult<T> {
    let codec = provider.get::<T>()?;
    let mut reader = TaggedReader::with_options(text, provider.reader_options().clone());
    decode_with(codec.as_ref(), &mut reader)
}

/// Decode one complete value from raw UTF-8 bytes
pub fn decode_bytes<T: Codable>(provider: &CodecProvider, bytes: &[u8]) -> CodecResult<T> {
    let codec = provider.get::<T>()?;
    let mut reader =
        TaggedReader::from_bytes_with_options(bytes, provider.reader_options().clone())?;
    decode_with(codec.as_ref(), &mut reader)
}

/// Run `codec` over a fresh reader and require the input to end afterwards
pub fn decode_with<T>(codec: &dyn Codec<T>, reader: &mut TaggedReader<'_>) -> CodecResult<T> {
    advance(reader)?;
    let value = codec.decode(reader)?;
    if reader.read()? {
        return Err(CodecError::decode(format!(
            "trailing {} after complete value",
            reader.current_token()
        )));
    }
    Ok(value)
}

/// Encode `value` to a standalone string
pub fn encode_to_string<T: Codable>(provider: &CodecProvider, value: &T) -> CodecResult<String> {
    let codec = provider.get::<T>()?;
    let mut writer = TaggedWriter::new();
    codec.encode(&mut writer, value)?;
    Ok(writer.into_string())
}
