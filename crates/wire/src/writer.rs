//! Tagged wire writer
//!
//! [`TaggedWriter`] emits the grammar [`TaggedReader`](crate::TaggedReader)
//! reads. Scalars that JSON cannot type precisely go out as single-key tag
//! objects; strings, booleans and null are bare JSON literals.

use crate::number::{format_double, format_float};
use crate::tags;
use base64::Engine;
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use docwire_core::Module;
use smallvec::SmallVec;

/// Open container on the writer side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Object,
    /// Closes with `}}`: the payload plus the `{"@tag": ...}` wrapper
    Wrapped,
    Array,
}

#[derive(Debug, Clone, Copy)]
struct Level {
    scope: Scope,
    first: bool,
}

/// Append-only tagged JSON builder.
///
/// One writer serves one encode pass. Callers are expected to balance every
/// `start_*` with its `end_*`.
#[derive(Debug, Default)]
pub struct TaggedWriter {
    out: String,
    levels: SmallVec<[Level; 16]>,
    after_field_name: bool,
}

impl TaggedWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a pre-sized output buffer
    pub fn with_capacity(capacity: usize) -> Self {
        TaggedWriter {
            out: String::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// The text written so far
    pub fn serialize(&self) -> String {
        self.out.clone()
    }

    /// Borrow the text written so far
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Consume the writer, returning its text
    pub fn into_string(self) -> String {
        self.out
    }

    /// Consume the writer, returning UTF-8 bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.out.into_bytes()
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    /// `{`
    pub fn start_object(&mut self) {
        self.before_value();
        self.out.push('{');
        self.open(Scope::Object);
    }

    /// `}`
    pub fn end_object(&mut self) {
        self.close();
    }

    /// `{"@object":{`
    pub fn start_escaped_object(&mut self) {
        self.start_wrapper(tags::OBJECT);
    }

    /// `}}`
    pub fn end_escaped_object(&mut self) {
        self.close();
    }

    /// `{"@ref":{`
    pub fn start_ref(&mut self) {
        self.start_wrapper(tags::REF);
    }

    /// `}}`
    pub fn end_ref(&mut self) {
        self.close();
    }

    /// `{"@set":{`
    pub fn start_page(&mut self) {
        self.start_wrapper(tags::SET);
    }

    /// `}}`
    pub fn end_page(&mut self) {
        self.close();
    }

    /// `[`
    pub fn start_array(&mut self) {
        self.before_value();
        self.out.push('[');
        self.open(Scope::Array);
    }

    /// `]`
    pub fn end_array(&mut self) {
        self.close();
    }

    /// Object key; the next write is its value
    pub fn write_field_name(&mut self, name: &str) {
        if let Some(level) = self.levels.last_mut() {
            if !level.first {
                self.out.push(',');
            }
            level.first = false;
        }
        push_json_string(&mut self.out, name);
        self.out.push(':');
        self.after_field_name = true;
    }

    // ------------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------------

    /// Bare JSON string
    pub fn write_string(&mut self, value: &str) {
        self.before_value();
        push_json_string(&mut self.out, value);
    }

    /// `true` / `false`
    pub fn write_boolean(&mut self, value: bool) {
        self.before_value();
        self.out.push_str(if value { "true" } else { "false" });
    }

    /// `null`
    pub fn write_null(&mut self) {
        self.before_value();
        self.out.push_str("null");
    }

    /// `{"@int":"..."}`
    pub fn write_int(&mut self, value: i32) {
        self.write_tagged(tags::INT, &value.to_string());
    }

    /// `{"@long":"..."}`
    pub fn write_long(&mut self, value: i64) {
        self.write_tagged(tags::LONG, &value.to_string());
    }

    /// `{"@double":"..."}`
    pub fn write_double(&mut self, value: f64) {
        self.write_tagged(tags::DOUBLE, &format_double(value));
    }

    /// `{"@double":"..."}` at f32 precision
    pub fn write_float(&mut self, value: f32) {
        self.write_tagged(tags::DOUBLE, &format_float(value));
    }

    /// `{"@date":"yyyy-MM-dd"}`
    pub fn write_date(&mut self, value: NaiveDate) {
        self.write_tagged(tags::DATE, &value.format("%Y-%m-%d").to_string());
    }

    /// `{"@time":"..."}`, normalised to UTC with a `Z` suffix
    pub fn write_time<Tz: TimeZone>(&mut self, value: &DateTime<Tz>) {
        let utc = value.with_timezone(&Utc);
        self.write_tagged(tags::TIME, &utc.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }

    /// `{"@mod":"..."}`
    pub fn write_module(&mut self, value: &Module) {
        self.write_tagged(tags::MODULE, value.name());
    }

    /// `{"@bytes":"<base64>"}`
    pub fn write_bytes(&mut self, value: &[u8]) {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        self.write_tagged(tags::BYTES, &encoded);
    }

    /// `{"@set":"..."}`: a set sent as a cursor only
    pub fn write_set_cursor(&mut self, cursor: &str) {
        self.write_tagged(tags::SET, cursor);
    }

    /// `{"@stream":"..."}`
    pub fn write_stream(&mut self, token: &str) {
        self.write_tagged(tags::STREAM, token);
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn write_tagged(&mut self, tag: &str, payload: &str) {
        self.before_value();
        self.out.push('{');
        push_json_string(&mut self.out, tag);
        self.out.push(':');
        push_json_string(&mut self.out, payload);
        self.out.push('}');
    }

    fn start_wrapper(&mut self, tag: &str) {
        self.before_value();
        self.out.push('{');
        push_json_string(&mut self.out, tag);
        self.out.push_str(":{");
        self.open(Scope::Wrapped);
    }

    fn before_value(&mut self) {
        if self.after_field_name {
            self.after_field_name = false;
            return;
        }
        if let Some(level) = self.levels.last_mut() {
            if level.scope == Scope::Array {
                if !level.first {
                    self.out.push(',');
                }
                level.first = false;
            }
        }
    }

    fn open(&mut self, scope: Scope) {
        self.levels.push(Level { scope, first: true });
    }

    fn close(&mut self) {
        match self.levels.pop().map(|l| l.scope) {
            Some(Scope::Object) => self.out.push('}'),
            Some(Scope::Wrapped) => self.out.push_str("}}"),
            Some(Scope::Array) => self.out.push(']'),
            None => {}
        }
    }
}

/// Append `s` as a quoted JSON string
fn push_json_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
