//! Canonical text forms for `@double` payloads
//!
//! Finite values use Rust's shortest round-trip formatting with a forced
//! decimal point (`1.0`, never `1`). Non-finite values use `NaN`,
//! `Infinity` and `-Infinity`.

/// Format an f64 for a `@double` payload
pub fn format_double(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        ensure_decimal_point(f.to_string())
    }
}

/// Format an f32 for a `@double` payload, keeping f32 precision
pub fn format_float(f: f32) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f32::INFINITY {
        "Infinity".to_string()
    } else if f == f32::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        ensure_decimal_point(f.to_string())
    }
}

fn ensure_decimal_point(s: String) -> String {
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{}.0", s)
    }
}

/// Parse a `@double` payload (or an integer payload widened to double)
pub fn parse_double(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => s.parse::<f64>().ok().filter(|f| f.is_finite()),
    }
}

/// Parse a `@double` payload at f32 precision
pub fn parse_float(s: &str) -> Option<f32> {
    match s {
        "NaN" => Some(f32::NAN),
        "Infinity" => Some(f32::INFINITY),
        "-Infinity" => Some(f32::NEG_INFINITY),
        _ => s.parse::<f32>().ok().filter(|f| f.is_finite()),
    }
}
