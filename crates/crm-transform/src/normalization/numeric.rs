//! Numeric normalization.

/// Parse an integer field value.
///
/// Thousands separators are removed and the value is parsed as a float and
/// truncated, so `"1,234.9"` becomes `1234`. Non-finite or out-of-range
/// values yield `None`.
pub fn parse_integer(value: &str) -> Option<i64> {
    let cleaned = value.trim().replace(',', "");
    let parsed = parse_finite(&cleaned)?.trunc();
    // i64::MAX is not exactly representable; the bound is exclusive.
    if parsed >= -(2f64.powi(63)) && parsed < 2f64.powi(63) {
        Some(parsed as i64)
    } else {
        None
    }
}

/// Parse a decimal, currency or percent value.
///
/// Commas, `$` and `%` are removed first.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%'))
        .collect();
    parse_finite(&cleaned)
}

fn parse_finite(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
