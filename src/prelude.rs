//! Convenient imports for docwire.
//!
//! ```
//! use docwire::prelude::*;
//!
//! let dw = Docwire::new();
//! let v: Value = dw.decode(r#"{"@mod":"Users"}"#).unwrap();
//! assert_eq!(v, Value::Module(Module::new("Users")));
//! ```

// Main entry point
pub use crate::docwire::{Docwire, DocwireBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Envelopes
pub use crate::feed::{Event, EventType, FeedPage};
pub use crate::response::{ErrorInfo, QueryFailure, QueryResponse, QueryStats, QuerySuccess};
pub use crate::stream::StreamDecoder;

// Data model
pub use docwire_core::{
    Bytes, CodecError, Document, DocumentKey, DocumentRef, Module, NamedDocument,
    NamedDocumentRef, NullDocument, NullableDocument, Page, StreamToken, Value,
};

// Codecs
pub use docwire_codec::{Codable, Codec, CodecProvider, CodecRegistry, FieldSet, Record};

// Wire access
pub use docwire_wire::{ReaderOptions, TaggedReader, TaggedWriter, Token, WireType};
