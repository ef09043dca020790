//! Query response envelopes
//!
//! A response body is plain JSON whose `data` field (or, for failures,
//! `error.abort`) carries tagged wire data:
//!
//! ```text
//! {"data":{"@int":"1"},"static_type":"Int","txn_ts":1702000000000000,
//!  "summary":"","query_tags":"env=prod","stats":{"compute_ops":1,...}}
//! {"error":{"code":"invalid_query","message":"..."},"txn_ts":...}
//! ```
//!
//! Envelope numbers (`txn_ts`, `schema_version`, the stats counters) are
//! bare JSON numbers, so envelopes are always read with bare numbers
//! allowed, whatever the provider's reader options say.

use crate::error::{Error, Result};
use docwire_codec::{record_codec, Codable, Codec, CodecProvider, FieldSet, Record};
use docwire_core::{CodecError, CodecResult, Value};
use docwire_wire::{ReaderOptions, TaggedReader, Token};
use std::collections::HashMap;
use std::sync::Arc;

/// Cost and usage counters reported with every response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Transactional compute operations consumed
    pub compute_ops: i64,
    /// Transactional read operations consumed
    pub read_ops: i64,
    /// Transactional write operations consumed
    pub write_ops: i64,
    /// Server-side query time in milliseconds
    pub query_time_ms: i64,
    /// Retries caused by transaction contention
    pub contention_retries: i64,
    /// Bytes read from storage
    pub storage_bytes_read: i64,
    /// Bytes written to storage
    pub storage_bytes_write: i64,
    /// Names of the rate limits that were hit, if any
    pub rate_limits_hit: Vec<String>,
}

impl Record for QueryStats {
    fn describe(fields: &mut FieldSet<'_, Self>) {
        fields
            .field("compute_ops", |s| &s.compute_ops, |s| &mut s.compute_ops)
            .field("read_ops", |s| &s.read_ops, |s| &mut s.read_ops)
            .field("write_ops", |s| &s.write_ops, |s| &mut s.write_ops)
            .field("query_time_ms", |s| &s.query_time_ms, |s| &mut s.query_time_ms)
            .field(
                "contention_retries",
                |s| &s.contention_retries,
                |s| &mut s.contention_retries,
            )
            .field(
                "storage_bytes_read",
                |s| &s.storage_bytes_read,
                |s| &mut s.storage_bytes_read,
            )
            .field(
                "storage_bytes_write",
                |s| &s.storage_bytes_write,
                |s| &mut s.storage_bytes_write,
            )
            .field("rate_limits_hit", |s| &s.rate_limits_hit, |s| &mut s.rate_limits_hit);
    }
}

impl Codable for QueryStats {
    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        record_codec::<Self>(provider)
    }
}

/// Server-reported error
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorInfo {
    /// Stable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Value passed to `abort()`, when the query aborted itself
    pub abort: Option<Value>,
}

impl Record for ErrorInfo {
    fn describe(fields: &mut FieldSet<'_, Self>) {
        fields
            .field("code", |e| &e.code, |e| &mut e.code)
            .field("message", |e| &e.message, |e| &mut e.message)
            .field("abort", |e| &e.abort, |e| &mut e.abort);
    }
}

impl Codable for ErrorInfo {
    fn build_codec(provider: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        record_codec::<Self>(provider)
    }
}

/// A successful query response
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySuccess<T> {
    /// The decoded query result
    pub data: T,
    /// Static type of the result, when type checking is enabled
    pub static_type: Option<String>,
    /// Transaction timestamp in microseconds
    pub txn_ts: Option<i64>,
    /// Query summary (warnings, hints)
    pub summary: Option<String>,
    /// Tags echoed back from the request
    pub query_tags: HashMap<String, String>,
    /// Usage counters
    pub stats: QueryStats,
    /// Schema version the query ran against
    pub schema_version: Option<i64>,
}

/// A failed query response
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFailure {
    /// What went wrong
    pub error: ErrorInfo,
    /// Transaction timestamp in microseconds
    pub txn_ts: Option<i64>,
    /// Query summary, usually with the error position
    pub summary: Option<String>,
    /// Tags echoed back from the request
    pub query_tags: HashMap<String, String>,
    /// Usage counters
    pub stats: QueryStats,
    /// Schema version the query ran against
    pub schema_version: Option<i64>,
}

/// Either side of a query response
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse<T> {
    /// The query ran and produced data
    Success(QuerySuccess<T>),
    /// The server rejected or aborted the query
    Failure(QueryFailure),
}

impl<T> QueryResponse<T> {
    /// Check if the query succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, QueryResponse::Success(_))
    }

    /// Usage counters, present on both sides
    pub fn stats(&self) -> &QueryStats {
        match self {
            QueryResponse::Success(s) => &s.stats,
            QueryResponse::Failure(f) => &f.stats,
        }
    }

    /// Turn a failure envelope into [`Error::Query`]
    pub fn into_result(self) -> Result<QuerySuccess<T>> {
        match self {
            QueryResponse::Success(s) => Ok(s),
            QueryResponse::Failure(f) => Err(f.into()),
        }
    }
}

/// Codecs shared by every envelope reader
pub(crate) struct EnvelopeCodecs {
    pub(crate) stats: Arc<dyn Codec<QueryStats>>,
    pub(crate) error: Arc<dyn Codec<ErrorInfo>>,
}

impl EnvelopeCodecs {
    pub(crate) fn resolve(provider: &CodecProvider) -> Result<Self> {
        Ok(EnvelopeCodecs {
            stats: provider.get::<QueryStats>()?,
            error: provider.get::<ErrorInfo>()?,
        })
    }
}

/// Reader options for envelope bodies
pub(crate) fn envelope_options(provider: &CodecProvider) -> ReaderOptions {
    ReaderOptions {
        allow_bare_numbers: true,
        ..provider.reader_options().clone()
    }
}

pub(crate) fn next(reader: &mut TaggedReader<'_>) -> Result<()> {
    if reader.read()? {
        Ok(())
    } else {
        Err(CodecError::UnexpectedEnd.into())
    }
}

/// Walk the fields of the object at the current token.
///
/// `f` receives each field name with the reader on the field's value and
/// must leave the reader on that value's last token.
pub(crate) fn for_each_field<F>(reader: &mut TaggedReader<'_>, what: &str, mut f: F) -> Result<()>
where
    F: FnMut(&str, &mut TaggedReader<'_>) -> Result<()>,
{
    if reader.current_token() != Token::StartObject {
        return Err(Error::Protocol(format!(
            "{} must be a JSON object, got {}",
            what,
            reader.current_token()
        )));
    }
    loop {
        next(reader)?;
        match reader.current_token() {
            Token::EndObject => return Ok(()),
            Token::FieldName => {
                let name = reader.field_name()?.to_string();
                next(reader)?;
                f(&name, reader)?;
            }
            other => {
                return Err(Error::Protocol(format!("unexpected {} in {}", other, what)));
            }
        }
    }
}

/// Read a whole body: one object and nothing after it
pub(crate) fn read_body<F>(reader: &mut TaggedReader<'_>, what: &str, f: F) -> Result<()>
where
    F: FnMut(&str, &mut TaggedReader<'_>) -> Result<()>,
{
    next(reader)?;
    for_each_field(reader, what, f)?;
    if reader.read()? {
        return Err(Error::Protocol(format!(
            "trailing {} after {}",
            reader.current_token(),
            what
        )));
    }
    Ok(())
}

pub(crate) fn optional_string(reader: &TaggedReader<'_>) -> Result<Option<String>> {
    match reader.current_token() {
        Token::Null => Ok(None),
        _ => Ok(Some(reader.value_as_string()?)),
    }
}

pub(crate) fn optional_long(reader: &TaggedReader<'_>) -> Result<Option<i64>> {
    match reader.current_token() {
        Token::Null => Ok(None),
        _ => Ok(Some(reader.value_as_long()?)),
    }
}

/// Parse `"k=v,k2=v2"` query tags
pub fn parse_query_tags(raw: &str) -> Result<HashMap<String, String>> {
    raw.split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| Error::Protocol(format!("malformed query tag `{}`", pair)))
        })
        .collect()
}

/// Fields common to both envelope sides
#[derive(Default)]
struct Common {
    txn_ts: Option<i64>,
    summary: Option<String>,
    query_tags: HashMap<String, String>,
    stats: QueryStats,
    schema_version: Option<i64>,
}

impl Common {
    /// Returns false when `name` is not a common field
    fn read(
        &mut self,
        name: &str,
        reader: &mut TaggedReader<'_>,
        codecs: &EnvelopeCodecs,
    ) -> Result<bool> {
        match name {
            "txn_ts" => self.txn_ts = optional_long(reader)?,
            "summary" => self.summary = optional_string(reader)?,
            "schema_version" => self.schema_version = optional_long(reader)?,
            "query_tags" => {
                if let Some(raw) = optional_string(reader)? {
                    self.query_tags = parse_query_tags(&raw)?;
                }
            }
            "stats" => self.stats = codecs.stats.decode(reader)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Decode a response body, resolving `T` through `provider`
pub fn read_query_response<T: Codable>(
    provider: &CodecProvider,
    body: &str,
) -> Result<QueryResponse<T>> {
    let data_codec = provider.get::<T>()?;
    let codecs = EnvelopeCodecs::resolve(provider)?;
    let mut reader = TaggedReader::with_options(body, envelope_options(provider));

    let mut data = None;
    let mut error = None;
    let mut static_type = None;
    let mut common = Common::default();

    read_body(&mut reader, "query response", |name, reader| {
        match name {
            "data" => data = Some(data_codec.decode(reader)?),
            "error" => error = Some(codecs.error.decode(reader)?),
            "static_type" => static_type = optional_string(reader)?,
            _ => {
                if !common.read(name, reader, &codecs)? {
                    reader.skip()?;
                }
            }
        }
        Ok(())
    })?;

    match (error, data) {
        (Some(error), _) => Ok(QueryResponse::Failure(QueryFailure {
            error,
            txn_ts: common.txn_ts,
            summary: common.summary,
            query_tags: common.query_tags,
            stats: common.stats,
            schema_version: common.schema_version,
        })),
        (None, Some(data)) => Ok(QueryResponse::Success(QuerySuccess {
            data,
            static_type,
            txn_ts: common.txn_ts,
            summary: common.summary,
            query_tags: common.query_tags,
            stats: common.stats,
            schema_version: common.schema_version,
        })),
        (None, None) => Err(Error::Protocol(
            "query response has neither `data` nor `error`".to_string(),
        )),
    }
}
