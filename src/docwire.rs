//! Main entry point for docwire.
//!
//! [`Docwire`] bundles a codec registry with the reader options used for
//! one-shot decoding. Handles are cheap to clone; clones share the registry
//! and therefore every codec built through any of them.

use crate::error::Result;
use crate::feed::{read_feed_page, FeedPage};
use crate::response::{read_query_response, QueryResponse, QuerySuccess};
use crate::stream::StreamDecoder;
use docwire_codec::{Codable, Codec, CodecProvider, CodecRegistry};
use docwire_core::Value;
use docwire_wire::{ReaderOptions, TaggedReader, TaggedWriter};
use std::sync::Arc;
use tracing::debug;

/// A configured codec handle.
///
/// # Example
///
/// ```
/// use docwire::prelude::*;
///
/// let dw = Docwire::new();
/// let n: i64 = dw.decode(r#"{"@long":"10"}"#)?;
/// assert_eq!(dw.encode(&n)?, r#"{"@long":"10"}"#);
/// # Ok::<(), docwire::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct Docwire {
    provider: CodecProvider,
}

impl Docwire {
    /// Handle over a fresh registry with default reader options
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Handle over the process-wide registry with default reader options
    pub fn shared() -> Self {
        Self::builder().shared_registry().build()
    }

    /// Create a builder for handle configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use docwire::prelude::*;
    ///
    /// let dw = Docwire::builder().strict().max_depth(32).build();
    /// assert!(dw.decode::<i32>("1").is_err());
    /// ```
    pub fn builder() -> DocwireBuilder {
        DocwireBuilder::new()
    }

    /// The underlying codec provider
    pub fn provider(&self) -> &CodecProvider {
        &self.provider
    }

    /// The codec registry backing this handle
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        self.provider.registry()
    }

    /// Reader options used by one-shot decoding
    pub fn reader_options(&self) -> &ReaderOptions {
        self.provider.reader_options()
    }

    /// Resolve the codec for `T`, building and caching it on first use
    pub fn codec<T: Codable>(&self) -> Result<Arc<dyn Codec<T>>> {
        Ok(self.provider.get::<T>()?)
    }

    /// Encode `value` to tagged wire text
    pub fn encode<T: Codable>(&self, value: &T) -> Result<String> {
        Ok(docwire_codec::encode_to_string(&self.provider, value)?)
    }

    /// Decode one complete value of type `T`
    pub fn decode<T: Codable>(&self, text: &str) -> Result<T> {
        Ok(docwire_codec::decode_str(&self.provider, text)?)
    }

    /// Decode one complete value of type `T` from UTF-8 bytes
    pub fn decode_bytes<T: Codable>(&self, bytes: &[u8]) -> Result<T> {
        Ok(docwire_codec::decode_bytes(&self.provider, bytes)?)
    }

    /// Decode without a static type
    pub fn decode_value(&self, text: &str) -> Result<Value> {
        self.decode::<Value>(text)
    }

    /// A reader over `text` with this handle's options
    pub fn reader<'a>(&self, text: &'a str) -> TaggedReader<'a> {
        TaggedReader::with_options(text, self.reader_options().clone())
    }

    /// An empty writer
    pub fn writer(&self) -> TaggedWriter {
        TaggedWriter::new()
    }

    /// Decode a query response body with `data` of type `T`
    pub fn decode_query_response<T: Codable>(&self, body: &str) -> Result<QueryResponse<T>> {
        read_query_response(&self.provider, body)
    }

    /// Decode a query response body, turning a failure envelope into an error
    pub fn decode_query_result<T: Codable>(&self, body: &str) -> Result<QuerySuccess<T>> {
        self.decode_query_response(body)?.into_result()
    }

    /// Decode one event-feed page with event data of type `E`
    pub fn decode_feed_page<E: Codable>(&self, body: &str) -> Result<FeedPage<E>> {
        read_feed_page(&self.provider, body)
    }

    /// An incremental decoder for a stream of events with data of type `E`
    pub fn stream_decoder<E: Codable>(&self) -> Result<StreamDecoder<E>> {
        StreamDecoder::new(&self.provider)
    }
}

impl Default for Docwire {
    fn default() -> Self {
        Self::new()
    }
}

type Registration = Box<dyn FnOnce(&CodecRegistry) + Send>;

/// Builder for [`Docwire`] handles.
///
/// # Example
///
/// ```
/// use docwire::prelude::*;
/// use std::sync::Arc;
///
/// // Two handles sharing one cache, with different parsing rules
/// let registry = Arc::new(CodecRegistry::new());
/// let lenient = Docwire::builder().with_registry(registry.clone()).build();
/// let strict = Docwire::builder().with_registry(registry).strict().build();
///
/// assert_eq!(lenient.decode::<i32>("7").unwrap(), 7);
/// assert!(strict.decode::<i32>("7").is_err());
/// ```
pub struct DocwireBuilder {
    options: ReaderOptions,
    registry: Option<Arc<CodecRegistry>>,
    registrations: Vec<Registration>,
}

impl DocwireBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            options: ReaderOptions::default(),
            registry: None,
            registrations: Vec::new(),
        }
    }

    /// Replace the reader options wholesale.
    pub fn reader_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the maximum container nesting accepted when decoding.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Reject bare JSON numbers; only tagged numbers are accepted.
    ///
    /// Response and event envelopes still read their own bare counters.
    pub fn strict(mut self) -> Self {
        self.options.allow_bare_numbers = false;
        self
    }

    /// Accept bare JSON numbers and deep nesting.
    pub fn lenient(mut self) -> Self {
        self.options = ReaderOptions::lenient();
        self
    }

    /// Install a custom codec for `T`, replacing the built-in one.
    ///
    /// Registration happens at [`build`](Self::build) time, so with a shared
    /// registry it affects every handle over that registry.
    pub fn register<T: Codable>(mut self, codec: Arc<dyn Codec<T>>) -> Self {
        self.registrations
            .push(Box::new(move |registry: &CodecRegistry| registry.register::<T>(codec)));
        self
    }

    /// Build over an existing registry, sharing its cache.
    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build over the process-wide registry.
    pub fn shared_registry(self) -> Self {
        self.with_registry(CodecRegistry::shared())
    }

    /// Build the handle.
    pub fn build(self) -> Docwire {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CodecRegistry::new()));
        let registered = self.registrations.len();
        for registration in self.registrations {
            registration(&registry);
        }
        debug!(
            registered,
            max_depth = self.options.max_depth,
            bare_numbers = self.options.allow_bare_numbers,
            "built docwire handle"
        );
        Docwire {
            provider: CodecProvider::with_registry(registry).with_reader_options(self.options),
        }
    }
}

impl Default for DocwireBuilder {
    fn default() -> Self {
        Self::new()
    }
}
