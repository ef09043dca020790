//! Pull reader for the tagged wire format
//!
//! [`TaggedReader`] turns plain JSON events into [`Token`]s:
//!
//! - `{"@int":"42"}` and the other scalar tags collapse into one scalar token
//!   whose raw payload is kept for type-directed conversion
//! - `{"@object":{...}}` becomes `StartObject` .. `EndObject` over the inner object
//! - `{"@doc":{...}}`, `{"@ref":{...}}`, `{"@set":{...}}` become
//!   `StartDocument`/`StartRef`/`StartPage` and their matching ends
//! - `{"@set":"cursor"}` becomes `StartPage`, `String`, `EndPage`
//! - any other object is a plain `StartObject`
//!
//! A `}` in the input can close any of these, so the reader keeps a stack of
//! open [`Frame`]s and maps each close by what is on top.

use crate::lexer::{JsonEvent, JsonLexer};
use crate::number::{parse_double, parse_float};
use crate::options::ReaderOptions;
use crate::tags;
use crate::token::Token;
use base64::Engine;
use chrono::{DateTime, NaiveDate, Utc};
use docwire_core::{CodecError, CodecResult, Module, StreamToken};
use smallvec::SmallVec;

/// Kind of container the reader is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// Plain `{...}`
    Object,
    /// `{"@object":{...}}`: one extra `}` closes the wrapper
    EscapedObject,
    /// `{"@doc":{...}}`
    Document,
    /// `{"@ref":{...}}`
    Ref,
    /// `{"@set":{...}}`
    Page,
    /// `{"@set":"cursor"}`: the wrapper `}` is the only close
    UnmaterializedPage,
    /// `[...]`
    Array,
}

/// Forward-only cursor over tagged wire data.
///
/// One reader serves one decode pass; it is not shared between threads.
pub struct TaggedReader<'a> {
    lexer: JsonLexer<'a>,
    options: ReaderOptions,
    current: Token,
    value: Option<String>,
    pending: Option<JsonEvent>,
    frames: SmallVec<[Frame; 16]>,
}

impl<'a> TaggedReader<'a> {
    /// Create a reader over UTF-8 text with default options
    pub fn new(input: &'a str) -> Self {
        Self::with_options(input, ReaderOptions::default())
    }

    /// Create a reader with explicit options
    pub fn with_options(input: &'a str, options: ReaderOptions) -> Self {
        TaggedReader {
            lexer: JsonLexer::new(input),
            options,
            current: Token::None,
            value: None,
            pending: None,
            frames: SmallVec::new(),
        }
    }

    /// Create a reader over raw bytes.
    ///
    /// A multi-byte character cut off at the end of the buffer is reported as
    /// [`CodecError::UnexpectedEnd`]; any other invalid UTF-8 is a decode error.
    pub fn from_bytes(input: &'a [u8]) -> CodecResult<Self> {
        Self::from_bytes_with_options(input, ReaderOptions::default())
    }

    /// Create a reader over raw bytes with explicit options
    pub fn from_bytes_with_options(input: &'a [u8], options: ReaderOptions) -> CodecResult<Self> {
        match std::str::from_utf8(input) {
            Ok(s) => Ok(Self::with_options(s, options)),
            Err(e) if e.error_len().is_none() => Err(CodecError::UnexpectedEnd),
            Err(e) => Err(CodecError::decode(format!(
                "invalid UTF-8 at byte {}",
                e.valid_up_to()
            ))),
        }
    }

    /// The token the cursor rests on; `Token::None` before the first read
    pub fn current_token(&self) -> Token {
        self.current
    }

    /// Raw payload of the current token (tagged scalar text, string, field name)
    pub fn raw_value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Number of containers currently open
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Byte offset just past the last consumed input.
    ///
    /// After a complete top-level value has been decoded this is the length of
    /// that value's text, which lets callers split concatenated values.
    pub fn offset(&self) -> usize {
        self.lexer.position()
    }

    /// Advance to the next token.
    ///
    /// Returns `false` once the input is exhausted.
    pub fn read(&mut self) -> CodecResult<bool> {
        self.value = None;
        let event = match self.pending.take() {
            Some(event) => event,
            None => match self.lexer.next_event()? {
                Some(event) => event,
                None if self.frames.is_empty() => return Ok(false),
                None => return Err(CodecError::UnexpectedEnd),
            },
        };

        match event {
            JsonEvent::StartObject => self.handle_start_object()?,
            JsonEvent::EndObject => self.handle_end_object()?,
            JsonEvent::StartArray => {
                self.push(Frame::Array)?;
                self.current = Token::StartArray;
            }
            JsonEvent::EndArray => match self.frames.pop() {
                Some(Frame::Array) => self.current = Token::EndArray,
                other => return Err(self.unbalanced("]", other)),
            },
            JsonEvent::FieldName(name) => self.set(Token::FieldName, name),
            JsonEvent::String(s) => self.set(Token::String, s),
            JsonEvent::Number(raw) => self.handle_bare_number(raw)?,
            JsonEvent::True => self.current = Token::True,
            JsonEvent::False => self.current = Token::False,
            JsonEvent::Null => self.current = Token::Null,
        }
        Ok(true)
    }

    /// Skip the subtree opened by the current token.
    ///
    /// On any start token, consumes everything up to and including the
    /// matching end token. On any other token this is a no-op.
    pub fn skip(&mut self) -> CodecResult<()> {
        if !self.current.is_start() {
            return Ok(());
        }
        let mut depth = 1usize;
        while depth > 0 {
            if !self.read()? {
                return Err(CodecError::UnexpectedEnd);
            }
            if self.current.is_start() {
                depth += 1;
            } else if self.current.is_end() {
                depth -= 1;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Tag disambiguation
    // ------------------------------------------------------------------------

    fn handle_start_object(&mut self) -> CodecResult<()> {
        match self.next_event()? {
            JsonEvent::FieldName(name) => match name.as_str() {
                tags::INT => self.read_tagged_scalar(Token::Int, tags::INT),
                tags::LONG => self.read_tagged_scalar(Token::Long, tags::LONG),
                tags::DOUBLE => self.read_tagged_scalar(Token::Double, tags::DOUBLE),
                tags::DATE => self.read_tagged_scalar(Token::Date, tags::DATE),
                tags::TIME => self.read_tagged_scalar(Token::Time, tags::TIME),
                tags::MODULE => self.read_tagged_scalar(Token::Module, tags::MODULE),
                tags::BYTES => self.read_tagged_scalar(Token::Bytes, tags::BYTES),
                tags::STREAM => self.read_tagged_scalar(Token::Stream, tags::STREAM),
                tags::OBJECT => self.open_wrapper(Frame::EscapedObject, Token::StartObject, tags::OBJECT),
                tags::DOC => self.open_wrapper(Frame::Document, Token::StartDocument, tags::DOC),
                tags::REF => self.open_wrapper(Frame::Ref, Token::StartRef, tags::REF),
                tags::SET => match self.next_event()? {
                    JsonEvent::StartObject => {
                        self.push(Frame::Page)?;
                        self.current = Token::StartPage;
                        Ok(())
                    }
                    JsonEvent::String(cursor) => {
                        self.push(Frame::UnmaterializedPage)?;
                        self.current = Token::StartPage;
                        self.pending = Some(JsonEvent::String(cursor));
                        Ok(())
                    }
                    other => Err(CodecError::decode(format!(
                        "expected object or string for {}, got {:?}",
                        tags::SET,
                        other
                    ))),
                },
                _ => {
                    // Plain object: the key we peeked at is the next token
                    self.push(Frame::Object)?;
                    self.current = Token::StartObject;
                    self.pending = Some(JsonEvent::FieldName(name));
                    Ok(())
                }
            },
            JsonEvent::EndObject => {
                self.push(Frame::Object)?;
                self.current = Token::StartObject;
                self.pending = Some(JsonEvent::EndObject);
                Ok(())
            }
            other => Err(CodecError::decode(format!(
                "expected field name after '{{', got {:?}",
                other
            ))),
        }
    }

    fn handle_end_object(&mut self) -> CodecResult<()> {
        let frame = self.frames.pop();
        self.current = match frame {
            Some(Frame::Object) => Token::EndObject,
            Some(Frame::UnmaterializedPage) => Token::EndPage,
            Some(Frame::EscapedObject) => {
                self.close_wrapper(tags::OBJECT)?;
                Token::EndObject
            }
            Some(Frame::Document) => {
                self.close_wrapper(tags::DOC)?;
                Token::EndDocument
            }
            Some(Frame::Ref) => {
                self.close_wrapper(tags::REF)?;
                Token::EndRef
            }
            Some(Frame::Page) => {
                self.close_wrapper(tags::SET)?;
                Token::EndPage
            }
            other => return Err(self.unbalanced("}", other)),
        };
        Ok(())
    }

    fn read_tagged_scalar(&mut self, token: Token, tag: &str) -> CodecResult<()> {
        let payload = match self.next_event()? {
            JsonEvent::String(s) => s,
            other => {
                return Err(CodecError::decode(format!(
                    "expected string payload for {}, got {:?}",
                    tag, other
                )))
            }
        };
        match self.next_event()? {
            JsonEvent::EndObject => {}
            other => {
                return Err(CodecError::decode(format!(
                    "tagged value {} must have exactly one key, found {:?}",
                    tag, other
                )))
            }
        }
        self.set(token, payload);
        Ok(())
    }

    fn open_wrapper(&mut self, frame: Frame, token: Token, tag: &str) -> CodecResult<()> {
        match self.next_event()? {
            JsonEvent::StartObject => {
                self.push(frame)?;
                self.current = token;
                Ok(())
            }
            other => Err(CodecError::decode(format!(
                "expected object for {}, got {:?}",
                tag, other
            ))),
        }
    }

    /// Consume the `}` of a `{"@tag": {...}}` wrapper
    fn close_wrapper(&mut self, tag: &str) -> CodecResult<()> {
        match self.next_event()? {
            JsonEvent::EndObject => Ok(()),
            other => Err(CodecError::decode(format!(
                "unexpected {:?} after {} payload",
                other, tag
            ))),
        }
    }

    fn handle_bare_number(&mut self, raw: String) -> CodecResult<()> {
        if !self.options.allow_bare_numbers {
            return Err(CodecError::decode(format!(
                "untagged number {} not allowed; expected @int, @long or @double",
                raw
            )));
        }
        let token = if raw.contains(['.', 'e', 'E']) {
            Token::Double
        } else if raw.parse::<i32>().is_ok() {
            Token::Int
        } else if raw.parse::<i64>().is_ok() {
            Token::Long
        } else {
            Token::Double
        };
        self.set(token, raw);
        Ok(())
    }

    fn next_event(&mut self) -> CodecResult<JsonEvent> {
        match self.lexer.next_event()? {
            Some(event) => Ok(event),
            None => Err(CodecError::UnexpectedEnd),
        }
    }

    fn push(&mut self, frame: Frame) -> CodecResult<()> {
        if self.frames.len() >= self.options.max_depth {
            return Err(CodecError::decode(format!(
                "maximum nesting depth {} exceeded",
                self.options.max_depth
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    fn set(&mut self, token: Token, value: String) {
        self.current = token;
        self.value = Some(value);
    }

    fn unbalanced(&self, closer: &str, frame: Option<Frame>) -> CodecError {
        CodecError::decode(format!(
            "unbalanced '{}' at position {} (open container: {:?})",
            closer,
            self.lexer.position(),
            frame
        ))
    }

    // ------------------------------------------------------------------------
    // Typed accessors
    // ------------------------------------------------------------------------

    fn expect(&self, target: &str, accepted: &[Token]) -> CodecResult<&str> {
        if !accepted.contains(&self.current) {
            let names: Vec<&str> = accepted.iter().map(|t| t.name()).collect();
            return Err(CodecError::decode(format!(
                "cannot read {} as {}; expected token one of [{}]",
                self.current,
                target,
                names.join(", ")
            )));
        }
        Ok(self.value.as_deref().unwrap_or(""))
    }

    fn invalid(&self, target: &str, raw: &str) -> CodecError {
        CodecError::decode(format!("invalid {} value {:?} in {} token", target, raw, self.current))
    }

    /// Borrow the current string token
    pub fn value_as_str(&self) -> CodecResult<&str> {
        self.expect("string", &[Token::String])
    }

    /// The current string token, owned
    pub fn value_as_string(&self) -> CodecResult<String> {
        self.value_as_str().map(str::to_string)
    }

    /// The current field name
    pub fn field_name(&self) -> CodecResult<&str> {
        self.expect("field name", &[Token::FieldName])
    }

    /// `Int` as i32
    pub fn value_as_int(&self) -> CodecResult<i32> {
        let raw = self.expect("int", &[Token::Int])?;
        raw.parse::<i32>().map_err(|_| self.invalid("int", raw))
    }

    /// `Int` or `Long` as i64
    pub fn value_as_long(&self) -> CodecResult<i64> {
        let raw = self.expect("long", &[Token::Int, Token::Long])?;
        raw.parse::<i64>().map_err(|_| self.invalid("long", raw))
    }

    /// `Int`, `Long` or `Double` as f64
    pub fn value_as_double(&self) -> CodecResult<f64> {
        let raw = self.expect("double", &[Token::Int, Token::Long, Token::Double])?;
        parse_double(raw).ok_or_else(|| self.invalid("double", raw))
    }

    /// `Int`, `Long` or `Double` as f32
    pub fn value_as_float(&self) -> CodecResult<f32> {
        let raw = self.expect("float", &[Token::Int, Token::Long, Token::Double])?;
        parse_float(raw).ok_or_else(|| self.invalid("float", raw))
    }

    /// `Int` narrowed to i8; out-of-range values are an error
    pub fn value_as_byte(&self) -> CodecResult<i8> {
        let raw = self.expect("byte", &[Token::Int])?;
        raw.parse::<i8>().map_err(|_| self.invalid("byte", raw))
    }

    /// `Int` narrowed to i16; out-of-range values are an error
    pub fn value_as_short(&self) -> CodecResult<i16> {
        let raw = self.expect("short", &[Token::Int])?;
        raw.parse::<i16>().map_err(|_| self.invalid("short", raw))
    }

    /// `Int` interpreted as a 16-bit code point
    pub fn value_as_char(&self) -> CodecResult<char> {
        let raw = self.expect("char", &[Token::Int])?;
        raw.parse::<u16>()
            .ok()
            .and_then(|unit| char::from_u32(u32::from(unit)))
            .ok_or_else(|| self.invalid("char", raw))
    }

    /// `True` or `False`
    pub fn value_as_boolean(&self) -> CodecResult<bool> {
        self.expect("boolean", &[Token::True, Token::False])?;
        Ok(self.current == Token::True)
    }

    /// `Date` as a calendar date
    pub fn value_as_local_date(&self) -> CodecResult<NaiveDate> {
        let raw = self.expect("date", &[Token::Date])?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| self.invalid("date", raw))
    }

    /// `Time` as an instant in UTC
    pub fn value_as_time(&self) -> CodecResult<DateTime<Utc>> {
        let raw = self.expect("time", &[Token::Time])?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| self.invalid("time", raw))
    }

    /// `Bytes` decoded from base64
    pub fn value_as_byte_array(&self) -> CodecResult<Vec<u8>> {
        let raw = self.expect("bytes", &[Token::Bytes])?;
        base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| CodecError::decode(format!("invalid base64 in Bytes token: {}", e)))
    }

    /// `Module` as a module reference
    pub fn value_as_module(&self) -> CodecResult<Module> {
        self.expect("module", &[Token::Module]).map(Module::new)
    }

    /// `Stream` as an event source token
    pub fn value_as_stream(&self) -> CodecResult<StreamToken> {
        self.expect("stream", &[Token::Stream])
            .map(|raw| StreamToken(raw.to_string()))
    }
}
