//! Parameter value coercion.
//!
//! Accepted numeric grammar: an optional leading `+` or `-`, then ASCII
//! digits with at most one `.` and at least one digit overall. Exponents,
//! hex, whitespace and `inf`/`nan` are not numbers.

use mf_core::ParamValue;

/// Coerce a raw parameter value into a number when the whole text is
/// numeric, otherwise keep it as a string. Never fails.
pub fn coerce(raw: &str) -> ParamValue {
    if is_decimal(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return ParamValue::Number(n);
        }
    }
    ParamValue::Text(raw.to_string())
}

fn is_decimal(raw: &str) -> bool {
    let digits = raw.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(raw);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for b in digits.bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}
