//! Event feeds and stream events
//!
//! A feed page is a plain JSON envelope:
//!
//! ```text
//! {"events":[{"type":"add","data":{"@doc":{...}},"txn_ts":1,"cursor":"c1","stats":{...}}],
//!  "cursor":"c1","has_next":false,"stats":{...}}
//! ```
//!
//! Events use the same shape whether they arrive in a feed page or one at a
//! time on a stream (see [`StreamDecoder`](crate::StreamDecoder)).

use crate::error::{Error, Result};
use crate::response::{
    envelope_options, for_each_field, next, optional_long, optional_string, read_body,
    EnvelopeCodecs, ErrorInfo, QueryStats,
};
use docwire_codec::{Codable, Codec, CodecProvider};
use docwire_wire::{TaggedReader, Token};
use std::fmt;

/// Kind of change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// First event on a stream; carries the starting cursor
    Start,
    /// A document entered the watched set
    Add,
    /// A document in the watched set changed
    Update,
    /// A document left the watched set
    Remove,
    /// Progress marker with no data
    Status,
    /// The feed failed; `error` is set
    Error,
}

impl EventType {
    /// Parse the wire name
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "start" => EventType::Start,
            "add" => EventType::Add,
            "update" => EventType::Update,
            "remove" => EventType::Remove,
            "status" => EventType::Status,
            "error" => EventType::Error,
            _ => return None,
        })
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Start => "start",
            EventType::Add => "add",
            EventType::Update => "update",
            EventType::Remove => "remove",
            EventType::Status => "status",
            EventType::Error => "error",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change event
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    /// What happened
    pub event_type: EventType,
    /// Transaction timestamp in microseconds
    pub txn_ts: Option<i64>,
    /// Position to resume from after this event
    pub cursor: String,
    /// The changed document, for add/update/remove
    pub data: Option<E>,
    /// Why the feed failed, for error events
    pub error: Option<ErrorInfo>,
    /// Usage counters
    pub stats: QueryStats,
}

impl<E> Event<E> {
    /// Check if this event reports a feed failure
    pub fn is_error(&self) -> bool {
        self.event_type == EventType::Error
    }

    /// Turn an error event into [`Error::Query`]
    pub fn into_result(self) -> Result<Self> {
        if let (EventType::Error, Some(info)) = (self.event_type, &self.error) {
            return Err(Error::Query {
                code: info.code.clone(),
                message: info.message.clone(),
            });
        }
        Ok(self)
    }
}

/// One page of an event feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage<E> {
    /// Events in commit order
    pub events: Vec<Event<E>>,
    /// Cursor for the next page
    pub cursor: String,
    /// Whether another page is immediately available
    pub has_next: bool,
    /// Usage counters for the page request
    pub stats: QueryStats,
}

/// Read the event object at the current token
pub(crate) fn read_event<E>(
    reader: &mut TaggedReader<'_>,
    element: &dyn Codec<E>,
    codecs: &EnvelopeCodecs,
) -> Result<Event<E>> {
    let mut event_type = None;
    let mut txn_ts = None;
    let mut cursor = None;
    let mut data = None;
    let mut error = None;
    let mut stats = QueryStats::default();

    for_each_field(reader, "event", |name, reader| {
        match name {
            "type" => {
                let raw = reader.value_as_str()?;
                event_type = Some(
                    EventType::parse(raw)
                        .ok_or_else(|| Error::Protocol(format!("unknown event type `{}`", raw)))?,
                );
            }
            "txn_ts" => txn_ts = optional_long(reader)?,
            "cursor" => cursor = optional_string(reader)?,
            "data" => {
                if reader.current_token() != Token::Null {
                    data = Some(element.decode(reader)?);
                }
            }
            "error" => error = Some(codecs.error.decode(reader)?),
            "stats" => stats = codecs.stats.decode(reader)?,
            _ => reader.skip()?,
        }
        Ok(())
    })?;

    let event_type =
        event_type.ok_or_else(|| Error::Protocol("event is missing `type`".to_string()))?;
    if event_type == EventType::Error && error.is_none() {
        return Err(Error::Protocol("error event is missing `error`".to_string()));
    }
    Ok(Event {
        event_type,
        txn_ts,
        cursor: cursor.unwrap_or_default(),
        data,
        error,
        stats,
    })
}

/// Decode a feed page body, resolving `E` through `provider`
pub fn read_feed_page<E: Codable>(provider: &CodecProvider, body: &str) -> Result<FeedPage<E>> {
    let element = provider.get::<E>()?;
    let codecs = EnvelopeCodecs::resolve(provider)?;
    let mut reader = TaggedReader::with_options(body, envelope_options(provider));

    let mut events = Vec::new();
    let mut cursor = None;
    let mut has_next = false;
    let mut stats = QueryStats::default();

    read_body(&mut reader, "feed page", |name, reader| {
        match name {
            "events" => {
                if reader.current_token() != Token::StartArray {
                    return Err(Error::Protocol(format!(
                        "feed events must be an array, got {}",
                        reader.current_token()
                    )));
                }
                loop {
                    next(reader)?;
                    if reader.current_token() == Token::EndArray {
                        break;
                    }
                    events.push(read_event(reader, element.as_ref(), &codecs)?);
                }
            }
            "cursor" => cursor = optional_string(reader)?,
            "has_next" => has_next = reader.value_as_boolean()?,
            "stats" => stats = codecs.stats.decode(reader)?,
            _ => reader.skip()?,
        }
        Ok(())
    })?;

    let cursor = cursor.ok_or_else(|| Error::Protocol("feed page is missing `cursor`".to_string()))?;
    Ok(FeedPage {
        events,
        cursor,
        has_next,
        stats,
    })
}
