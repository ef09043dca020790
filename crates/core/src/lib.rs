//! Core types for docwire
//!
//! This crate defines the value model shared by the wire reader/writer and
//! the codec layer:
//! - [`Value`]: dynamic value tree for untyped wire data
//! - [`Document`], [`DocumentRef`] and friends: the document family
//! - [`Page`]: cursor-paginated result set
//! - [`CodecError`]: the error taxonomy for every codec operation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod page;
pub mod value;

pub use document::{
    Document, DocumentKey, DocumentRef, NamedDocument, NamedDocumentRef, NullDocument,
    NullableDocument,
};
pub use error::{CodecError, CodecResult};
pub use page::Page;
pub use value::{Bytes, Module, StreamToken, Value};
