//! Incremental event stream decoding
//!
//! Stream bodies arrive as arbitrary byte chunks carrying a sequence of
//! event objects, optionally separated by whitespace. Chunk boundaries can
//! fall anywhere, including inside a multi-byte character.
//!
//! [`StreamDecoder`] buffers the chunks and attempts to decode one event from
//! the front of the buffer. A truncated event surfaces as
//! [`CodecError::UnexpectedEnd`]; the decoder keeps the bytes and waits for
//! more. Every other failure is final and drops the buffered bytes.

use crate::error::{Error, Result};
use crate::feed::{read_event, Event};
use crate::response::{envelope_options, next, EnvelopeCodecs};
use docwire_codec::{Codable, Codec, CodecProvider};
use docwire_core::CodecError;
use docwire_wire::{ReaderOptions, TaggedReader};
use std::sync::Arc;
use tracing::debug;

/// Buffers stream chunks and yields complete events
pub struct StreamDecoder<E> {
    element: Arc<dyn Codec<E>>,
    codecs: EnvelopeCodecs,
    options: ReaderOptions,
    buffer: Vec<u8>,
}

impl<E: Codable> StreamDecoder<E> {
    /// Create a decoder resolving `E` through `provider`
    pub fn new(provider: &CodecProvider) -> Result<Self> {
        Ok(StreamDecoder {
            element: provider.get::<E>()?,
            codecs: EnvelopeCodecs::resolve(provider)?,
            options: envelope_options(provider),
            buffer: Vec::new(),
        })
    }
}

impl<E> StreamDecoder<E> {
    /// Append a chunk of the stream body
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes waiting for the rest of an event
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Decode the next complete event, if the buffer holds one.
    ///
    /// Returns `Ok(None)` when the buffer is empty or ends mid-event.
    pub fn next_event(&mut self) -> Result<Option<Event<E>>> {
        let start = self
            .buffer
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(self.buffer.len());
        self.buffer.drain(..start);
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.decode_front() {
            Ok((event, consumed)) => {
                self.buffer.drain(..consumed);
                Ok(Some(event))
            }
            Err(e) if e.needs_more_input() => {
                debug!(buffered = self.buffer.len(), "incomplete event, waiting for more input");
                Ok(None)
            }
            Err(e) => {
                self.buffer.clear();
                Err(e)
            }
        }
    }

    /// Feed a chunk and drain every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Event<E>>> {
        self.feed(chunk);
        let mut events = Vec::new();
        while let Some(event) = self.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    /// Signal end of stream; leftover bytes mean the last event was cut off
    pub fn finish(self) -> Result<()> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            Ok(())
        } else {
            Err(CodecError::UnexpectedEnd.into())
        }
    }

    fn decode_front(&self) -> Result<(Event<E>, usize)> {
        let text = match std::str::from_utf8(&self.buffer) {
            Ok(text) => text,
            // An incomplete character at the tail can only belong to a later event
            Err(e) if e.error_len().is_none() => std::str::from_utf8(&self.buffer[..e.valid_up_to()])
                .map_err(|e| CodecError::decode(format!("invalid UTF-8: {}", e)))?,
            Err(e) => {
                return Err(Error::Codec(CodecError::decode(format!(
                    "invalid UTF-8 at byte {}",
                    e.valid_up_to()
                ))))
            }
        };

        let mut reader = TaggedReader::with_options(text, self.options.clone());
        next(&mut reader)?;
        let event = read_event(&mut reader, self.element.as_ref(), &self.codecs)?;
        Ok((event, reader.offset()))
    }
}
