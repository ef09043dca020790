//! Property tests through the `Docwire` facade

use docwire::prelude::*;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Product {
    name: String,
    quantity: i32,
    weight: Option<i64>,
    tags: Vec<String>,
}

impl Record for Product {
    fn describe(fields: &mut FieldSet<'_, Self>) {
        fields
            .field("name", |p| &p.name, |p| &mut p.name)
            .field("quantity", |p| &p.quantity, |p| &mut p.quantity)
            .field("weight", |p| &p.weight, |p| &mut p.weight)
            .field("tags", |p| &p.tags, |p| &mut p.tags);
    }
}

impl Codable for Product {
    fn build_codec(provider: &CodecProvider) -> docwire::model::CodecResult<Arc<dyn Codec<Self>>> {
        docwire::codec::record_codec::<Self>(provider)
    }
}

fn product() -> impl Strategy<Value = Product> {
    (
        ".*",
        any::<i32>(),
        proptest::option::of(any::<i64>()),
        proptest::collection::vec("[a-z@]{0,5}", 0..4),
    )
        .prop_map(|(name, quantity, weight, tags)| Product {
            name,
            quantity,
            weight,
            tags,
        })
}

proptest! {
    #[test]
    fn records_round_trip(p in product()) {
        let dw = Docwire::new();
        let wire = dw.encode(&p).unwrap();
        let back: Product = dw.decode(&wire).unwrap();
        prop_assert_eq!(dw.encode(&back).unwrap(), wire);
        prop_assert_eq!(back, p);
    }

    #[test]
    fn strict_handle_reads_what_it_writes(p in product()) {
        let dw = Docwire::builder().strict().build();
        let wire = dw.encode(&p).unwrap();
        prop_assert_eq!(dw.decode::<Product>(&wire).unwrap(), p);
    }

    #[test]
    fn stream_events_survive_any_chunking(
        names in proptest::collection::vec(".*", 1..6),
        chunk in 1usize..48,
    ) {
        let body: String = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let event = json!({"type": "add", "txn_ts": i, "cursor": format!("c{}", i), "data": name});
                format!("{}\r\n", event)
            })
            .collect();

        let mut decoder = Docwire::new().stream_decoder::<String>().unwrap();
        let mut events = Vec::new();
        for piece in body.as_bytes().chunks(chunk) {
            events.extend(decoder.push(piece).unwrap());
        }
        decoder.finish().unwrap();

        let got: Vec<String> = events.into_iter().filter_map(|e| e.data).collect();
        prop_assert_eq!(got, names);
    }
}
