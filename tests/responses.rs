//! Response envelopes, feed pages and streams through the facade

use docwire::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn stats() -> serde_json::Value {
    json!({
        "compute_ops": 1,
        "read_ops": 4,
        "write_ops": 0,
        "query_time_ms": 15,
        "contention_retries": 0,
        "storage_bytes_read": 256,
        "storage_bytes_write": 0,
        "rate_limits_hit": ["read"]
    })
}

fn doc(id: &str, name: &str) -> serde_json::Value {
    json!({"@doc": {
        "id": id,
        "coll": {"@mod": "Users"},
        "ts": {"@time": "2024-02-01T10:00:00Z"},
        "name": name
    }})
}

#[derive(Debug, Default, PartialEq)]
struct User {
    id: Option<String>,
    name: String,
}

impl Record for User {
    fn describe(fields: &mut FieldSet<'_, Self>) {
        fields
            .id("id", false, |u| &u.id, |u| &mut u.id)
            .field("name", |u| &u.name, |u| &mut u.name);
    }
}

impl Codable for User {
    fn build_codec(provider: &CodecProvider) -> docwire::model::CodecResult<Arc<dyn Codec<Self>>> {
        docwire::codec::record_codec::<Self>(provider)
    }
}

// ============================================================================
// Query responses
// ============================================================================

mod query_responses {
    use super::*;

    #[test]
    fn test_paged_documents() {
        let body = json!({
            "data": {"@set": {"data": [doc("1", "ann"), doc("2", "bo")], "after": "next"}},
            "static_type": "Set<User>",
            "summary": "",
            "txn_ts": 1706781600000000i64,
            "query_tags": "app=tests",
            "stats": stats(),
            "schema_version": 0
        })
        .to_string();

        let dw = Docwire::new();
        let success = dw.decode_query_result::<Page<User>>(&body).unwrap();
        assert_eq!(success.data.len(), 2);
        assert_eq!(success.data.data[0].id.as_deref(), Some("1"));
        assert_eq!(success.data.data[1].name, "bo");
        assert_eq!(success.data.after.as_deref(), Some("next"));
        assert_eq!(success.txn_ts, Some(1706781600000000));
        assert_eq!(success.stats.storage_bytes_read, 256);
        assert_eq!(success.stats.rate_limits_hit, vec!["read".to_string()]);
        assert_eq!(success.query_tags.get("app").map(String::as_str), Some("tests"));
    }

    #[test]
    fn test_untyped_data() {
        let body = json!({"data": {"total": {"@long": "12"}, "ok": true}}).to_string();
        let success = Docwire::new().decode_query_result::<Value>(&body).unwrap();
        assert_eq!(success.data.get("total"), Some(&Value::Long(12)));
        assert_eq!(success.static_type, None);
    }

    #[test]
    fn test_missing_document_inside_data() {
        let body = json!({"data": {"@ref": {
            "id": "404", "coll": {"@mod": "Users"}, "exists": false, "cause": "not found"
        }}})
        .to_string();

        let dw = Docwire::new();
        let err = dw.decode_query_result::<User>(&body).unwrap_err();
        assert!(err.is_null_document());

        let success = dw.decode_query_result::<NullableDocument<User>>(&body).unwrap();
        assert_eq!(
            success.data.null_document().map(|n| n.cause.as_str()),
            Some("not found")
        );
    }

    #[test]
    fn test_failure_envelope() {
        let body = json!({
            "error": {"code": "unbound_variable", "message": "Unbound variable `x`"},
            "summary": "error: Unbound variable `x`\nat *query*:1:1",
            "txn_ts": 1,
            "stats": stats()
        })
        .to_string();

        let dw = Docwire::new();
        match dw.decode_query_response::<Value>(&body).unwrap() {
            QueryResponse::Failure(failure) => {
                assert_eq!(failure.error.code, "unbound_variable");
                assert!(failure.summary.unwrap().contains("1:1"));
                assert_eq!(failure.stats.query_time_ms, 15);
            }
            other => panic!("expected failure, got {:?}", other),
        }

        let err = dw.decode_query_result::<Value>(&body).unwrap_err();
        assert!(err.is_query_failure());
        assert_eq!(err.to_string(), "query failed [unbound_variable]: Unbound variable `x`");
    }

    #[test]
    fn test_data_type_mismatch_is_codec_error() {
        let body = json!({"data": "not a number"}).to_string();
        let err = Docwire::new().decode_query_result::<i64>(&body).unwrap_err();
        assert!(matches!(err, Error::Codec(CodecError::Decode { .. })));
    }

    #[test]
    fn test_strict_handle_reads_envelope() {
        let body = json!({"data": {"@int": "5"}, "txn_ts": 99}).to_string();
        let dw = Docwire::builder().strict().build();
        assert_eq!(dw.decode_query_result::<i32>(&body).unwrap().data, 5);
    }
}

// ============================================================================
// Feeds
// ============================================================================

mod feeds {
    use super::*;

    #[test]
    fn test_feed_page_of_records() {
        let body = json!({
            "events": [
                {"type": "add", "txn_ts": 10, "cursor": "c1", "data": doc("1", "ann"), "stats": stats()},
                {"type": "update", "txn_ts": 11, "cursor": "c2", "data": doc("1", "anne")},
                {"type": "status", "txn_ts": 12, "cursor": "c3"}
            ],
            "cursor": "c3",
            "has_next": false,
            "stats": stats()
        })
        .to_string();

        let page = Docwire::new().decode_feed_page::<User>(&body).unwrap();
        let kinds: Vec<EventType> = page.events.iter().map(|e| e.event_type).collect();
        assert_eq!(kinds, vec![EventType::Add, EventType::Update, EventType::Status]);
        assert_eq!(page.events[1].data.as_ref().map(|u| u.name.as_str()), Some("anne"));
        assert_eq!(page.events[2].data, None);
        assert_eq!(page.cursor, "c3");
        assert!(!page.has_next);
    }
}

// ============================================================================
// Streams
// ============================================================================

mod streams {
    use super::*;

    fn stream_body() -> String {
        [
            json!({"type": "start", "txn_ts": 1, "cursor": "c0"}),
            json!({"type": "add", "txn_ts": 2, "cursor": "c1", "data": doc("1", "ann")}),
            json!({"type": "remove", "txn_ts": 3, "cursor": "c2", "data": doc("1", "ann")}),
            json!({"type": "error", "cursor": "c2",
                   "error": {"code": "permission_denied", "message": "no access"}}),
        ]
        .iter()
        .map(|event| format!("{}\r\n", event))
        .collect()
    }

    #[test]
    fn test_stream_in_uneven_chunks() {
        let body = stream_body();
        let mut decoder = Docwire::new().stream_decoder::<User>().unwrap();
        let mut events = Vec::new();
        for chunk in body.as_bytes().chunks(7) {
            events.extend(decoder.push(chunk).unwrap());
        }
        decoder.finish().unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].event_type, EventType::Start);
        assert_eq!(events[1].data.as_ref().map(|u| u.name.as_str()), Some("ann"));
        assert_eq!(events[2].event_type, EventType::Remove);
        assert!(events[3].is_error());
    }

    #[test]
    fn test_error_event_surfaces_as_query_error() {
        let body = stream_body();
        let mut decoder = Docwire::new().stream_decoder::<User>().unwrap();
        let events = decoder.push(body.as_bytes()).unwrap();
        let results: Vec<_> = events.into_iter().map(Event::into_result).collect();
        assert!(results[..3].iter().all(|r| r.is_ok()));
        assert_eq!(
            results[3].as_ref().unwrap_err(),
            &Error::Query {
                code: "permission_denied".into(),
                message: "no access".into()
            }
        );
    }

    #[test]
    fn test_next_event_waits_for_more_input() {
        let mut decoder = Docwire::new().stream_decoder::<Value>().unwrap();
        decoder.feed(br#"{"type":"add","cursor":"c","data":{"@in"#);
        assert!(decoder.next_event().unwrap().is_none());
        decoder.feed(br#"t":"1"}}"#);
        let event = decoder.next_event().unwrap().unwrap();
        assert_eq!(event.data, Some(Value::Int(1)));
        assert!(decoder.next_event().unwrap().is_none());
    }
}
