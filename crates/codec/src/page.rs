//! Page codec
//!
//! Accepted wire shapes:
//!
//! - `{"@set":{"data":[...],"after":"..."}}`: a materialised page
//! - `{"@set":"..."}`: an unmaterialised set, decoded as an empty page
//!   carrying the cursor
//! - `{"data":[...],"after":"..."}`: a plain object with page fields
//! - anything else: one element, wrapped as a page with no cursor
//!
//! Pages always encode in the `@set` form; an unmaterialised page writes
//! its cursor back as `{"@set":"..."}`.

use crate::codec::{advance, Codable, Codec};
use crate::registry::{CodecKey, CodecProvider};
use docwire_core::{CodecError, CodecResult, Page};
use docwire_wire::{TaggedReader, TaggedWriter, Token, WireType};
use std::sync::Arc;

const PAGE_TYPES: &[WireType] = &[WireType::Set, WireType::Object];

/// Read a page starting at `StartPage` or `StartObject`
pub(crate) fn read_page_body<E, F>(reader: &mut TaggedReader<'_>, mut element: F) -> CodecResult<Page<E>>
where
    F: FnMut(&mut TaggedReader<'_>) -> CodecResult<E>,
{
    let end = match reader.current_token() {
        Token::StartPage => Token::EndPage,
        Token::StartObject => Token::EndObject,
        other => {
            return Err(CodecError::decode(format!(
                "expected page start, got {}",
                other
            )))
        }
    };

    advance(reader)?;
    if end == Token::EndPage && reader.current_token() == Token::String {
        let cursor = reader.value_as_string()?;
        advance(reader)?;
        if reader.current_token() != Token::EndPage {
            return Err(CodecError::decode(format!(
                "expected end of unmaterialized set, got {}",
                reader.current_token()
            )));
        }
        return Ok(Page::unmaterialized(cursor));
    }

    let mut page = Page::default();
    while reader.current_token() != end {
        if reader.current_token() != Token::FieldName {
            return Err(CodecError::decode(format!(
                "expected page field, got {}",
                reader.current_token()
            )));
        }
        let name = reader.field_name()?.to_string();
        advance(reader)?;
        match name.as_str() {
            "data" => page.data = read_elements(reader, &mut element)?,
            "after" => {
                page.after = match reader.current_token() {
                    Token::Null => None,
                    _ => Some(reader.value_as_string()?),
                }
            }
            _ => reader.skip()?,
        }
        advance(reader)?;
    }
    Ok(page)
}

fn read_elements<E, F>(reader: &mut TaggedReader<'_>, element: &mut F) -> CodecResult<Vec<E>>
where
    F: FnMut(&mut TaggedReader<'_>) -> CodecResult<E>,
{
    if reader.current_token() != Token::StartArray {
        return Err(CodecError::decode(format!(
            "page data must be an array, got {}",
            reader.current_token()
        )));
    }
    let mut items = Vec::new();
    loop {
        advance(reader)?;
        if reader.current_token() == Token::EndArray {
            return Ok(items);
        }
        items.push(element(reader)?);
    }
}

/// `{"@set":{"data":[...],"after":"..."}}`; `after` is omitted when absent.
/// Unmaterialised pages write `{"@set":"..."}`.
pub(crate) fn write_page<E, F>(writer: &mut TaggedWriter, page: &Page<E>, mut element: F) -> CodecResult<()>
where
    F: FnMut(&mut TaggedWriter, &E) -> CodecResult<()>,
{
    if let (false, Some(after)) = (page.is_materialized(), &page.after) {
        writer.write_set_cursor(after);
        return Ok(());
    }
    writer.start_page();
    writer.write_field_name("data");
    writer.start_array();
    for item in &page.data {
        element(writer, item)?;
    }
    writer.end_array();
    if let Some(after) = &page.after {
        writer.write_field_name("after");
        writer.write_string(after);
    }
    writer.end_page();
    Ok(())
}

/// Codec for [`Page<E>`]
pub struct PageCodec<E> {
    element: Arc<dyn Codec<E>>,
}

impl<E> PageCodec<E> {
    /// Page codec over an element codec
    pub fn new(element: Arc<dyn Codec<E>>) -> Self {
        PageCodec { element }
    }
}

impl<E> Codec<Page<E>> for PageCodec<E> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<Page<E>> {
        match reader.current_token() {
            Token::StartPage | Token::StartObject => {
                read_page_body(reader, |r| self.element.decode(r))
            }
            _ => self.element.decode(reader).map(Page::single),
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &Page<E>) -> CodecResult<()> {
        write_page(writer, value, |w, item| self.element.encode(w, item))
    }

    fn supported_types(&self) -> &[WireType] {
        PAGE_TYPES
    }
}

impl<E: Codable> Codable for Page<E> {
    fn codec_key() -> CodecKey {
        CodecKey::generic::<Page<()>, E>(std::any::type_name::<Self>())
    }

    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        Ok(Arc::new(PageCodec::new(provider.get::<E>()?)))
    }
}
