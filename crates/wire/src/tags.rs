//! Reserved tag keys
//!
//! A JSON object whose first key is one of these is not a user object:
//! scalar tags collapse into a single scalar token, structural tags wrap a
//! document, reference, set or escaped object.

/// `{"@int":"<i32>"}`
pub const INT: &str = "@int";
/// `{"@long":"<i64>"}`
pub const LONG: &str = "@long";
/// `{"@double":"<f64>"}`
pub const DOUBLE: &str = "@double";
/// `{"@date":"yyyy-MM-dd"}`
pub const DATE: &str = "@date";
/// `{"@time":"<RFC3339 UTC>"}`
pub const TIME: &str = "@time";
/// `{"@mod":"<module name>"}`
pub const MODULE: &str = "@mod";
/// `{"@bytes":"<base64>"}`
pub const BYTES: &str = "@bytes";
/// `{"@stream":"<token>"}`
pub const STREAM: &str = "@stream";
/// `{"@object":{...}}` escaped user object
pub const OBJECT: &str = "@object";
/// `{"@doc":{...}}`
pub const DOC: &str = "@doc";
/// `{"@ref":{...}}`
pub const REF: &str = "@ref";
/// `{"@set":{...}}` or `{"@set":"<cursor>"}`
pub const SET: &str = "@set";

/// Every key the reader interprets specially when it appears first in an object
pub const RESERVED: [&str; 12] = [
    INT, LONG, DOUBLE, DATE, TIME, MODULE, BYTES, STREAM, OBJECT, DOC, REF, SET,
];

/// Check if a user key would collide with a reserved tag.
///
/// Objects containing such a key must be written in escaped form.
pub fn is_reserved(key: &str) -> bool {
    key.starts_with('@') && RESERVED.contains(&key)
}

/// Check if any key in the sequence collides with a reserved tag
pub fn any_reserved<'a, I>(keys: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter().any(is_reserved)
}
