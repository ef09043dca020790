//! # docwire
//!
//! Tagged-value wire codec for a remote document database client.
//!
//! The database speaks JSON in which values plain JSON cannot type precisely
//! (64-bit integers, dates, collection names, documents, references, pages)
//! are wrapped in single-key tag objects such as `{"@long":"10"}`. docwire
//! reads and writes that format and maps it onto native Rust types.
//!
//! ## Quick Start
//!
//! ```
//! use docwire::prelude::*;
//!
//! let dw = Docwire::new();
//!
//! // Typed decoding
//! let page: Page<i32> = dw.decode(r#"{"@set":{"data":[{"@int":"1"}],"after":"next"}}"#)?;
//! assert_eq!(page.data, vec![1]);
//! assert!(page.has_next());
//!
//! // Untyped decoding
//! let v = dw.decode_value(r#"{"name":"Ann","age":{"@int":"41"}}"#)?;
//! assert_eq!(v.get("age"), Some(&Value::Int(41)));
//!
//! // Encoding
//! assert_eq!(dw.encode(&Module::new("Users"))?, r#"{"@mod":"Users"}"#);
//! # Ok::<(), docwire::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`docwire_wire`]: token-level [`TaggedReader`](prelude::TaggedReader)
//!   and [`TaggedWriter`](prelude::TaggedWriter)
//! - [`docwire_codec`]: the [`Codec`](prelude::Codec) trait, built-in codecs
//!   and the caching [`CodecRegistry`](prelude::CodecRegistry)
//! - this crate: the [`Docwire`] handle, query-response and event-feed
//!   envelopes, and the incremental [`StreamDecoder`]
//!
//! ## Custom types
//!
//! Structs map to wire objects by implementing
//! [`Record`](prelude::Record):
//!
//! ```
//! use docwire::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Product {
//!     name: String,
//!     quantity: i32,
//! }
//!
//! impl Record for Product {
//!     fn describe(fields: &mut FieldSet<'_, Self>) {
//!         fields
//!             .field("name", |p| &p.name, |p| &mut p.name)
//!             .field("quantity", |p| &p.quantity, |p| &mut p.quantity);
//!     }
//! }
//!
//! impl Codable for Product {
//!     fn build_codec(provider: &CodecProvider) -> docwire::model::CodecResult<Arc<dyn Codec<Self>>> {
//!         docwire::codec::record_codec::<Self>(provider)
//!     }
//! }
//!
//! let dw = Docwire::new();
//! let p: Product = dw.decode(r#"{"name":"pen","quantity":{"@int":"3"}}"#)?;
//! assert_eq!(p, Product { name: "pen".into(), quantity: 3 });
//! # Ok::<(), docwire::Error>(())
//! ```

#![warn(missing_docs)]

mod docwire;
mod error;
mod feed;
mod response;
mod stream;

pub mod prelude;

// Re-export main entry points
pub use crate::docwire::{Docwire, DocwireBuilder};
pub use error::{Error, Result};

// Re-export envelopes
pub use feed::{read_feed_page, Event, EventType, FeedPage};
pub use response::{
    parse_query_tags, read_query_response, ErrorInfo, QueryFailure, QueryResponse, QueryStats,
    QuerySuccess,
};
pub use stream::StreamDecoder;

// Re-export the layers
pub use docwire_codec as codec;
pub use docwire_core as model;
pub use docwire_wire as wire;
