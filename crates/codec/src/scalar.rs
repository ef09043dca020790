//! Codecs for leaf types
//!
//! Each scalar codec accepts a fixed set of tokens and converts through one of
//! the reader's typed accessors, so narrowing rules live in one place:
//!
//! | Target | Accepted tokens |
//! |--------|-----------------|
//! | `i8`, `i16`, `i32`, `char` | `Int` (range-checked) |
//! | `i64` | `Int`, `Long` |
//! | `f32`, `f64` | `Int`, `Long`, `Double` |
//!
//! Scalars are not nullable; wrap in `Option` to accept `null`.

use crate::codec::{unsupported, Codable, Codec};
use crate::registry::CodecProvider;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use docwire_core::{Bytes, CodecError, CodecResult, Module, StreamToken};
use docwire_wire::{TaggedReader, TaggedWriter, Token, WireType};
use std::sync::Arc;

type ReadFn<T> = fn(&TaggedReader<'_>) -> CodecResult<T>;
type WriteFn<T> = fn(&mut TaggedWriter, &T) -> CodecResult<()>;

/// Table-driven codec for one leaf type
pub struct ScalarCodec<T> {
    name: &'static str,
    accepts: &'static [Token],
    supported: &'static [WireType],
    read: ReadFn<T>,
    write: WriteFn<T>,
}

impl<T> ScalarCodec<T> {
    fn new(
        name: &'static str,
        accepts: &'static [Token],
        supported: &'static [WireType],
        read: ReadFn<T>,
        write: WriteFn<T>,
    ) -> Self {
        ScalarCodec {
            name,
            accepts,
            supported,
            read,
            write,
        }
    }
}

impl<T> Codec<T> for ScalarCodec<T> {
    fn decode(&self, reader: &mut TaggedReader<'_>) -> CodecResult<T> {
        let token = reader.current_token();
        if self.accepts.contains(&token) {
            (self.read)(reader)
        } else {
            Err(unsupported(self.name, token, self.supported))
        }
    }

    fn encode(&self, writer: &mut TaggedWriter, value: &T) -> CodecResult<()> {
        (self.write)(writer, value)
    }

    fn supported_types(&self) -> &[WireType] {
        self.supported
    }
}

const INT_TOKENS: &[Token] = &[Token::Int];
const INT_TYPES: &[WireType] = &[WireType::Int];
const LONG_TOKENS: &[Token] = &[Token::Int, Token::Long];
const LONG_TYPES: &[WireType] = &[WireType::Int, WireType::Long];
const FLOAT_TOKENS: &[Token] = &[Token::Int, Token::Long, Token::Double];
const FLOAT_TYPES: &[WireType] = &[WireType::Int, WireType::Long, WireType::Double];

fn leaf<T: Send + Sync + 'static>(codec: ScalarCodec<T>) -> CodecResult<Arc<dyn Codec<T>>> {
    Ok(Arc::new(codec))
}

impl Codable for String {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "String",
            &[Token::String],
            &[WireType::String],
            |r| r.value_as_string(),
            |w, v| {
                w.write_string(v);
                Ok(())
            },
        ))
    }
}

impl Codable for bool {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Boolean",
            &[Token::True, Token::False],
            &[WireType::Boolean],
            |r| r.value_as_boolean(),
            |w, v| {
                w.write_boolean(*v);
                Ok(())
            },
        ))
    }
}

impl Codable for i8 {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Byte",
            INT_TOKENS,
            INT_TYPES,
            |r| r.value_as_byte(),
            |w, v| {
                w.write_int(i32::from(*v));
                Ok(())
            },
        ))
    }
}

impl Codable for i16 {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Short",
            INT_TOKENS,
            INT_TYPES,
            |r| r.value_as_short(),
            |w, v| {
                w.write_int(i32::from(*v));
                Ok(())
            },
        ))
    }
}

impl Codable for i32 {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Int",
            INT_TOKENS,
            INT_TYPES,
            |r| r.value_as_int(),
            |w, v| {
                w.write_int(*v);
                Ok(())
            },
        ))
    }
}

impl Codable for i64 {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Long",
            LONG_TOKENS,
            LONG_TYPES,
            |r| r.value_as_long(),
            |w, v| {
                w.write_long(*v);
                Ok(())
            },
        ))
    }
}

impl Codable for f32 {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Float",
            FLOAT_TOKENS,
            FLOAT_TYPES,
            |r| r.value_as_float(),
            |w, v| {
                w.write_float(*v);
                Ok(())
            },
        ))
    }
}

impl Codable for f64 {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Double",
            FLOAT_TOKENS,
            FLOAT_TYPES,
            |r| r.value_as_double(),
            |w, v| {
                w.write_double(*v);
                Ok(())
            },
        ))
    }
}

impl Codable for char {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Char",
            INT_TOKENS,
            INT_TYPES,
            |r| r.value_as_char(),
            |w, v| {
                let unit = u16::try_from(u32::from(*v)).map_err(|_| {
                    CodecError::encode(format!(
                        "char U+{:04X} does not fit in a 16-bit code unit",
                        u32::from(*v)
                    ))
                })?;
                w.write_int(i32::from(unit));
                Ok(())
            },
        ))
    }
}

impl Codable for Bytes {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Bytes",
            &[Token::Bytes],
            &[WireType::Bytes],
            |r| r.value_as_byte_array().map(Bytes),
            |w, v| {
                w.write_bytes(v.as_slice());
                Ok(())
            },
        ))
    }
}

impl Codable for Module {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Module",
            &[Token::Module],
            &[WireType::Module],
            |r| r.value_as_module(),
            |w, v| {
                w.write_module(v);
                Ok(())
            },
        ))
    }
}

impl Codable for NaiveDate {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Date",
            &[Token::Date],
            &[WireType::Date],
            |r| r.value_as_local_date(),
            |w, v| {
                w.write_date(*v);
                Ok(())
            },
        ))
    }
}

impl Codable for DateTime<Utc> {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Time",
            &[Token::Time],
            &[WireType::Time],
            |r| r.value_as_time(),
            |w, v| {
                w.write_time(v);
                Ok(())
            },
        ))
    }
}

impl Codable for DateTime<FixedOffset> {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Time",
            &[Token::Time],
            &[WireType::Time],
            |r| r.value_as_time().map(DateTime::<FixedOffset>::from),
            |w, v| {
                w.write_time(v);
                Ok(())
            },
        ))
    }
}

impl Codable for StreamToken {
    fn build_codec(_: &CodecProvider) -> CodecResult<Arc<dyn Codec<Self>>> {
        leaf(ScalarCodec::new(
            "Stream",
            &[Token::Stream],
            &[WireType::Stream],
            |r| r.value_as_stream(),
            |w, v| {
                w.write_stream(v.as_str());
                Ok(())
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::{decode_str, encode_to_string, CodecProvider};
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
    use docwire_core::{Bytes, CodecError, Module, StreamToken};

    fn provider() -> CodecProvider {
        CodecProvider::new()
    }

    // === Tag disambiguation by target ===

    #[test]
    fn test_int_tag_decodes_into_every_int_target() {
        let p = provider();
        let wire = r#"{"@int":"42"}"#;
        assert_eq!(decode_str::<i8>(&p, wire).unwrap(), 42);
        assert_eq!(decode_str::<i16>(&p, wire).unwrap(), 42);
        assert_eq!(decode_str::<i32>(&p, wire).unwrap(), 42);
        assert_eq!(decode_str::<i64>(&p, wire).unwrap(), 42);
        assert_eq!(decode_str::<char>(&p, wire).unwrap(), '*');
        assert_eq!(decode_str::<f64>(&p, wire).unwrap(), 42.0);
        assert_eq!(decode_str::<f32>(&p, wire).unwrap(), 42.0);
    }

    #[test]
    fn test_long_tag_rejected_by_int() {
        let err = decode_str::<i32>(&provider(), r#"{"@long":"42"}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "decode error: unable to decode `Long` with `Int`. Supported types for codec are [Int]."
        );
    }

    #[test]
    fn test_null_rejected_by_scalars() {
        let err = decode_str::<String>(&provider(), "null").unwrap_err();
        assert!(err.to_string().contains("`Null`"));
    }

    #[test]
    fn test_byte_out_of_range() {
        assert!(matches!(
            decode_str::<i8>(&provider(), r#"{"@int":"128"}"#),
            Err(CodecError::Decode { .. })
        ));
    }

    // === Encode ===

    #[test]
    fn test_narrow_ints_encode_as_int_tag() {
        let p = provider();
        assert_eq!(encode_to_string(&p, &7i8).unwrap(), r#"{"@int":"7"}"#);
        assert_eq!(encode_to_string(&p, &-7i16).unwrap(), r#"{"@int":"-7"}"#);
        assert_eq!(encode_to_string(&p, &'A').unwrap(), r#"{"@int":"65"}"#);
    }

    #[test]
    fn test_char_outside_bmp_fails_to_encode() {
        assert!(matches!(
            encode_to_string(&provider(), &'\u{1F680}'),
            Err(CodecError::Encode { .. })
        ));
    }

    #[test]
    fn test_fixed_offset_time_normalised() {
        let p = provider();
        let t = FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 23, 13, 33, 10)
            .unwrap();
        let wire = encode_to_string(&p, &t).unwrap();
        assert_eq!(wire, r#"{"@time":"2024-01-23T20:33:10Z"}"#);
        let back: DateTime<FixedOffset> = decode_str(&p, &wire).unwrap();
        assert_eq!(back, t);
    }

    // === Round trips ===

    #[test]
    fn test_leaf_round_trips() {
        let p = provider();
        let date = NaiveDate::from_ymd_opt(2023, 12, 3).unwrap();
        let time = Utc.with_ymd_and_hms(2023, 12, 3, 14, 52, 10).unwrap();
        assert_eq!(decode_str::<NaiveDate>(&p, &encode_to_string(&p, &date).unwrap()).unwrap(), date);
        assert_eq!(decode_str::<DateTime<Utc>>(&p, &encode_to_string(&p, &time).unwrap()).unwrap(), time);

        let module = Module::new("Users");
        assert_eq!(decode_str::<Module>(&p, &encode_to_string(&p, &module).unwrap()).unwrap(), module);

        let bytes = Bytes(vec![0, 255, 7]);
        assert_eq!(decode_str::<Bytes>(&p, &encode_to_string(&p, &bytes).unwrap()).unwrap(), bytes);

        let token = StreamToken("abc".to_string());
        assert_eq!(decode_str::<StreamToken>(&p, &encode_to_string(&p, &token).unwrap()).unwrap(), token);
    }

    #[test]
    fn test_wire_fixtures_reencode_identically() {
        let p = provider();
        for wire in [r#"{"@double":"1.5"}"#, r#"{"@double":"NaN"}"#, r#"{"@double":"-Infinity"}"#] {
            let v: f64 = decode_str(&p, wire).unwrap();
            assert_eq!(encode_to_string(&p, &v).unwrap(), wire);
        }
        let wire = r#"{"@time":"2023-12-03T14:52:10.001Z"}"#;
        let t: DateTime<Utc> = decode_str(&p, wire).unwrap();
        assert_eq!(encode_to_string(&p, &t).unwrap(), wire);
    }
}
