//! Pull lexer for plain JSON
//!
//! Produces structural JSON events (object/array boundaries, field names,
//! scalars) one at a time. It knows nothing about tags; the
//! [`TaggedReader`](crate::TaggedReader) builds on top of it.
//!
//! Truncated input is reported as [`CodecError::UnexpectedEnd`] so streaming
//! callers can tell "need more bytes" apart from "malformed".

use docwire_core::{CodecError, CodecResult};
use smallvec::SmallVec;

/// One JSON-level event
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// Object key (already unescaped)
    FieldName(String),
    /// String value (already unescaped)
    String(String),
    /// Number literal, unparsed
    Number(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scope {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Expecting the single top-level value
    TopLevel,
    /// Just after `{`
    ObjectStart,
    /// After `,` inside an object
    ObjectKey,
    /// After `:` or after `,` inside an array
    Value,
    /// Just after `[`
    ArrayStart,
    /// After a complete value inside a container
    AfterValue,
    /// The top-level value is complete
    Done,
}

/// Forward-only JSON lexer over a string slice
pub struct JsonLexer<'a> {
    input: &'a str,
    pos: usize,
    scopes: SmallVec<[Scope; 16]>,
    state: State,
}

impl<'a> JsonLexer<'a> {
    /// Create a lexer over the given input
    pub fn new(input: &'a str) -> Self {
        JsonLexer {
            input,
            pos: 0,
            scopes: SmallVec::new(),
            state: State::TopLevel,
        }
    }

    /// Byte offset of the next unread character
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advance to the next event.
    ///
    /// Returns `Ok(None)` once the top-level value is complete and only
    /// whitespace remains, or when the input is empty.
    pub fn next_event(&mut self) -> CodecResult<Option<JsonEvent>> {
        loop {
            self.skip_whitespace();
            match self.state {
                State::TopLevel => {
                    if self.peek().is_none() {
                        return Ok(None);
                    }
                    return self.parse_value().map(Some);
                }
                State::Done => {
                    return match self.peek() {
                        None => Ok(None),
                        Some(c) => Err(self.error(format!("trailing character '{}'", c))),
                    };
                }
                State::ObjectStart => match self.peek() {
                    None => return Err(CodecError::UnexpectedEnd),
                    Some('}') => return self.close(Scope::Object).map(Some),
                    Some('"') => return self.parse_key().map(Some),
                    Some(c) => return Err(self.error(format!("expected string key, found '{}'", c))),
                },
                State::ObjectKey => match self.peek() {
                    None => return Err(CodecError::UnexpectedEnd),
                    Some('"') => return self.parse_key().map(Some),
                    Some(c) => return Err(self.error(format!("expected string key, found '{}'", c))),
                },
                State::Value => {
                    if self.peek().is_none() {
                        return Err(CodecError::UnexpectedEnd);
                    }
                    return self.parse_value().map(Some);
                }
                State::ArrayStart => match self.peek() {
                    None => return Err(CodecError::UnexpectedEnd),
                    Some(']') => return self.close(Scope::Array).map(Some),
                    Some(_) => return self.parse_value().map(Some),
                },
                State::AfterValue => {
                    let scope = self.scopes.last().copied();
                    match (scope, self.peek()) {
                        (_, None) => return Err(CodecError::UnexpectedEnd),
                        (Some(Scope::Object), Some(',')) => {
                            self.advance();
                            self.state = State::ObjectKey;
                        }
                        (Some(Scope::Object), Some('}')) => {
                            return self.close(Scope::Object).map(Some)
                        }
                        (Some(Scope::Array), Some(',')) => {
                            self.advance();
                            self.state = State::Value;
                        }
                        (Some(Scope::Array), Some(']')) => {
                            return self.close(Scope::Array).map(Some)
                        }
                        (_, Some(c)) => {
                            return Err(self.error(format!("unexpected character '{}'", c)))
                        }
                    }
                }
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if matches!(c, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: String) -> CodecError {
        CodecError::decode(format!("invalid JSON at position {}: {}", self.pos, message))
    }

    fn value_complete(&mut self) {
        self.state = if self.scopes.is_empty() {
            State::Done
        } else {
            State::AfterValue
        };
    }

    fn close(&mut self, scope: Scope) -> CodecResult<JsonEvent> {
        self.advance();
        match self.scopes.pop() {
            Some(open) if open == scope => {}
            _ => return Err(self.error("mismatched closing bracket".to_string())),
        }
        self.value_complete();
        Ok(match scope {
            Scope::Object => JsonEvent::EndObject,
            Scope::Array => JsonEvent::EndArray,
        })
    }

    fn parse_key(&mut self) -> CodecResult<JsonEvent> {
        let key = self.parse_string()?;
        self.skip_whitespace();
        match self.peek() {
            None => return Err(CodecError::UnexpectedEnd),
            Some(':') => self.advance(),
            Some(c) => return Err(self.error(format!("expected ':', found '{}'", c))),
        }
        self.state = State::Value;
        Ok(JsonEvent::FieldName(key))
    }

    fn parse_value(&mut self) -> CodecResult<JsonEvent> {
        match self.peek() {
            None => Err(CodecError::UnexpectedEnd),
            Some('{') => {
                self.advance();
                self.scopes.push(Scope::Object);
                self.state = State::ObjectStart;
                Ok(JsonEvent::StartObject)
            }
            Some('[') => {
                self.advance();
                self.scopes.push(Scope::Array);
                self.state = State::ArrayStart;
                Ok(JsonEvent::StartArray)
            }
            Some('"') => {
                let s = self.parse_string()?;
                self.value_complete();
                Ok(JsonEvent::String(s))
            }
            Some('t') => self.parse_literal("true", JsonEvent::True),
            Some('f') => self.parse_literal("false", JsonEvent::False),
            Some('n') => self.parse_literal("null", JsonEvent::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
        }
    }

    fn parse_literal(&mut self, literal: &str, event: JsonEvent) -> CodecResult<JsonEvent> {
        let rest = &self.input[self.pos..];
        if rest.starts_with(literal) {
            self.pos += literal.len();
            self.value_complete();
            Ok(event)
        } else if literal.starts_with(rest) {
            Err(CodecError::UnexpectedEnd)
        } else {
            Err(self.error(format!("expected '{}'", literal)))
        }
    }

    fn parse_number(&mut self) -> CodecResult<JsonEvent> {
        let start = self.pos;

        if self.peek() == Some('-') {
            self.advance();
        }
        let int_start = self.pos;
        self.skip_digits();
        if self.pos == int_start {
            return match self.peek() {
                None => Err(CodecError::UnexpectedEnd),
                Some(c) => Err(self.error(format!("expected digit, found '{}'", c))),
            };
        }

        if self.peek() == Some('.') {
            self.advance();
            let frac_start = self.pos;
            self.skip_digits();
            if self.pos == frac_start {
                return match self.peek() {
                    None => Err(CodecError::UnexpectedEnd),
                    Some(c) => Err(self.error(format!("expected digit, found '{}'", c))),
                };
            }
        }

        if let Some('e' | 'E') = self.peek() {
            self.advance();
            if let Some('+' | '-') = self.peek() {
                self.advance();
            }
            let exp_start = self.pos;
            self.skip_digits();
            if self.pos == exp_start {
                return match self.peek() {
                    None => Err(CodecError::UnexpectedEnd),
                    Some(c) => Err(self.error(format!("expected digit, found '{}'", c))),
                };
            }
        }

        let raw = self.input[start..self.pos].to_string();
        self.value_complete();
        Ok(JsonEvent::Number(raw))
    }

    fn skip_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn parse_string(&mut self) -> CodecResult<String> {
        self.advance(); // opening quote
        let mut result = String::new();

        loop {
            match self.peek() {
                None => return Err(CodecError::UnexpectedEnd),
                Some('"') => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        None => return Err(CodecError::UnexpectedEnd),
                        Some(c) => c,
                    };
                    self.advance();
                    match escaped {
                        '"' => result.push('"'),
                        '\\' => result.push('\\'),
                        '/' => result.push('/'),
                        'n' => result.push('\n'),
                        'r' => result.push('\r'),
                        't' => result.push('\t'),
                        'b' => result.push('\x08'),
                        'f' => result.push('\x0c'),
                        'u' => {
                            let c = self.parse_unicode_escape()?;
                            result.push(c);
                        }
                        c => return Err(self.error(format!("invalid escape: \\{}", c))),
                    }
                }
                Some(c) if (c as u32) < 0x20 => {
                    return Err(self.error("unescaped control character in string".to_string()))
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Parse the hex digits after `\u`, joining surrogate pairs
    fn parse_unicode_escape(&mut self) -> CodecResult<char> {
        let high = self.parse_hex4()?;
        if !(0xD800..=0xDBFF).contains(&high) {
            return char::from_u32(high)
                .ok_or_else(|| self.error("invalid unicode codepoint".to_string()));
        }

        // High surrogate: a low surrogate escape must follow
        let rest = &self.input[self.pos..];
        if rest.len() < 2 && "\\u".starts_with(rest) {
            return Err(CodecError::UnexpectedEnd);
        }
        if !rest.starts_with("\\u") {
            return Err(self.error("unpaired surrogate in unicode escape".to_string()));
        }
        self.pos += 2;
        let low = self.parse_hex4()?;
        if !(0xDC00..=0xDFFF).contains(&low) {
            return Err(self.error("invalid low surrogate in unicode escape".to_string()));
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode codepoint".to_string()))
    }

    fn parse_hex4(&mut self) -> CodecResult<u32> {
        let rest = &self.input[self.pos..];
        let digits: Vec<char> = rest.chars().take(4).collect();
        if digits.len() < 4 {
            if digits.iter().all(|c| c.is_ascii_hexdigit()) {
                return Err(CodecError::UnexpectedEnd);
            }
            return Err(self.error("invalid unicode escape".to_string()));
        }
        let mut code = 0u32;
        for c in digits {
            let digit = c
                .to_digit(16)
                .ok_or_else(|| self.error("invalid unicode escape".to_string()))?;
            code = code * 16 + digit;
        }
        self.pos += 4;
        Ok(code)
    }
}
