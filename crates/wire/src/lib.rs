//! Tagged JSON wire format
//!
//! The database speaks JSON in which values JSON cannot type precisely are
//! wrapped in single-key tag objects:
//!
//! | Value | Wire form |
//! |-------|-----------|
//! | 32-bit int | `{"@int":"42"}` |
//! | 64-bit int | `{"@long":"42"}` |
//! | Double | `{"@double":"1.5"}` |
//! | Date | `{"@date":"2023-12-03"}` |
//! | Instant | `{"@time":"2023-12-03T14:52:10.001Z"}` |
//! | Collection | `{"@mod":"Users"}` |
//! | Bytes | `{"@bytes":"AQID"}` |
//! | Event source | `{"@stream":"..."}` |
//! | Escaped object | `{"@object":{...}}` |
//! | Document | `{"@doc":{...}}` |
//! | Reference | `{"@ref":{...}}` |
//! | Set / page | `{"@set":{"data":[...],"after":"..."}}` or `{"@set":"..."}` |
//!
//! ## Examples
//!
//! ```
//! use docwire_wire::{TaggedReader, TaggedWriter, Token};
//!
//! let mut writer = TaggedWriter::new();
//! writer.write_int(42);
//! assert_eq!(writer.serialize(), r#"{"@int":"42"}"#);
//!
//! let mut reader = TaggedReader::new(r#"{"@int":"42"}"#);
//! assert!(reader.read().unwrap());
//! assert_eq!(reader.current_token(), Token::Int);
//! assert_eq!(reader.value_as_byte().unwrap(), 42i8);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lexer;
pub mod number;
pub mod options;
pub mod reader;
pub mod tags;
pub mod token;
pub mod writer;

pub use lexer::{JsonEvent, JsonLexer};
pub use options::ReaderOptions;
pub use reader::TaggedReader;
pub use token::{Token, WireType};
pub use writer::TaggedWriter;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn read_single(text: &str) -> TaggedReader<'_> {
        let mut reader = TaggedReader::new(text);
        assert!(reader.read().unwrap());
        reader
    }

    proptest! {
        #[test]
        fn long_roundtrip(v in any::<i64>()) {
            let mut w = TaggedWriter::new();
            w.write_long(v);
            let text = w.into_string();
            prop_assert_eq!(read_single(&text).value_as_long().unwrap(), v);
        }

        #[test]
        fn finite_double_roundtrip(v in any::<f64>().prop_filter("finite", |f| f.is_finite())) {
            let mut w = TaggedWriter::new();
            w.write_double(v);
            let text = w.into_string();
            prop_assert_eq!(read_single(&text).value_as_double().unwrap().to_bits(), v.to_bits());
        }

        #[test]
        fn string_roundtrip(s in any::<String>()) {
            let mut w = TaggedWriter::new();
            w.write_string(&s);
            let text = w.into_string();
            prop_assert_eq!(read_single(&text).value_as_string().unwrap(), s);
        }

        #[test]
        fn bytes_roundtrip(b in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut w = TaggedWriter::new();
            w.write_bytes(&b);
            let text = w.into_string();
            prop_assert_eq!(read_single(&text).value_as_byte_array().unwrap(), b);
        }

        #[test]
        fn skip_balances_nested_arrays(depth in 1usize..20) {
            let mut w = TaggedWriter::new();
            w.start_array();
            for _ in 0..depth {
                w.start_escaped_object();
                w.write_field_name("@ref");
                w.start_array();
            }
            for _ in 0..depth {
                w.end_array();
                w.end_escaped_object();
            }
            w.write_string("sibling");
            w.end_array();
            let text = w.into_string();

            let mut reader = TaggedReader::new(&text);
            reader.read().unwrap();
            reader.read().unwrap();
            reader.skip().unwrap();
            reader.read().unwrap();
            prop_assert_eq!(reader.value_as_str().unwrap(), "sibling");
        }
    }
}
