// Utility helpers for lenient number parsing and pt-BR formatting.
//
// Exports of the weekly collection are not uniform: the same field can be a
// JSON number, a numeric string or a MongoDB extended-JSON wrapper. This
// module turns all of those into typed values so the rest of the crate never
// touches `serde_json::Value`.
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in exports (spaces, separators, text).
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (`"NaN"`, `"n/a"`).
/// - Strips `","` thousands separators before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Numeric view of a JSON value.
///
/// Accepts plain numbers, numeric strings and the extended-JSON wrappers
/// `$numberInt`, `$numberLong`, `$numberDouble` and `$numberDecimal`.
pub fn value_as_f64(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_f64_safe(Some(s.as_str())),
        Value::Object(map) => ["$numberInt", "$numberLong", "$numberDouble", "$numberDecimal"]
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(|inner| value_as_f64(Some(inner))),
        _ => None,
    }
}

/// Integral view of a JSON value. Floats are accepted only when they carry
/// no fractional part (`12.0` but not `12.5`).
pub fn value_as_i64(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| whole_f64(n.as_f64()?)),
        Value::String(s) => parse_i64_safe(Some(s.as_str()))
            .or_else(|| whole_f64(parse_f64_safe(Some(s.as_str()))?)),
        other @ Value::Object(_) => whole_f64(value_as_f64(Some(other))?),
        _ => None,
    }
}

/// Non-negative integral view, used for counts (cases, population).
pub fn value_as_count(v: Option<&Value>) -> Option<u64> {
    value_as_i64(v).and_then(|n| u64::try_from(n).ok())
}

pub fn value_as_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn whole_f64(f: f64) -> Option<i64> {
    // Guard the cast: only finite integral values within i64 range.
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

/// Sum of optional counts, counting a missing value as zero.
pub fn sum_counts<I>(values: I) -> u64
where
    I: IntoIterator<Item = Option<u64>>,
{
    values.into_iter().map(|v| v.unwrap_or(0)).sum()
}

/// Round to a fixed number of decimals (used for per-100k rates).
pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value the way the dashboard shows it:
    // - a fixed number of decimal places, joined with `,`, and
    // - pt-BR thousands separators (e.g., `1.234.567,89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{abs_n:.decimals$}");
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::pt);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push(',');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{res}")
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts (`12.345 casos`).
    n.to_formatted_string(&Locale::pt)
}

/// `format_int` for optional counts; a missing value renders as `N/A`.
pub fn format_opt_count(n: Option<u64>) -> String {
    n.map_or_else(|| "N/A".to_string(), format_int)
}

pub fn format_opt_number(n: Option<f64>, decimals: usize) -> String {
    n.map_or_else(|| "N/A".to_string(), |v| format_number(v, decimals))
}
