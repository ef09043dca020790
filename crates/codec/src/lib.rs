//! Type-directed codecs for the tagged wire format
//!
//! - [`Codec<T>`]: decode from a [`TaggedReader`](docwire_wire::TaggedReader),
//!   encode to a [`TaggedWriter`](docwire_wire::TaggedWriter)
//! - [`Codable`]: types the [`CodecProvider`] can build a codec for
//! - [`CodecRegistry`]: the shared cache of built codecs
//!
//! Built-in support covers the leaf types (`String`, `bool`, `i8`..`i64`,
//! `f32`, `f64`, `char`, [`Bytes`](docwire_core::Bytes), dates and instants,
//! [`Module`](docwire_core::Module), [`StreamToken`](docwire_core::StreamToken)),
//! `Vec`, string-keyed `HashMap`/`BTreeMap`, `Option`, `Box`,
//! [`Page`](docwire_core::Page), [`NullableDocument`](docwire_core::NullableDocument),
//! the document family and the dynamic [`Value`](docwire_core::Value).
//! Structs opt in through [`Record`].
//!
//! ```
//! use docwire_codec::{decode_str, encode_to_string, CodecProvider};
//! use docwire_core::Page;
//!
//! let provider = CodecProvider::new();
//! let page: Page<i32> =
//!     decode_str(&provider, r#"{"@set":{"data":[{"@int":"99"}],"after":"afterme"}}"#).unwrap();
//! assert_eq!(page.data, vec![99]);
//! assert_eq!(encode_to_string(&provider, &99i16).unwrap(), r#"{"@int":"99"}"#);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod container;
pub mod document;
pub mod dynamic;
pub mod page;
pub mod record;
pub mod registry;
pub mod scalar;

pub use codec::{decode_bytes, decode_str, decode_with, encode_to_string, Codable, Codec};
pub use container::{ListCodec, MapCodec, NullableDocumentCodec, OptionCodec, StringMap};
pub use document::write_ref;
pub use dynamic::{decode_value, encode_value, DynamicCodec};
pub use page::PageCodec;
pub use record::{record_codec, FieldKind, FieldSet, Record, RecordCodec};
pub use registry::{CodecKey, CodecProvider, CodecRegistry, LazyCodec};
pub use scalar::ScalarCodec;
