//! Picklist value resolution.

/// Values shown in warnings before the list is elided.
const SHOWN_VALUES: usize = 5;

/// Resolve `value` against the allowed values.
///
/// An exact match is returned as-is; otherwise the first case-insensitive
/// match is returned in its canonical casing.
pub fn resolve_picklist<'a>(value: &str, allowed: &'a [String]) -> Option<&'a str> {
    if let Some(exact) = allowed.iter().find(|v| v.as_str() == value) {
        return Some(exact);
    }
    let lower = value.to_lowercase();
    allowed
        .iter()
        .find(|v| v.to_lowercase() == lower)
        .map(String::as_str)
}

/// Short listing of allowed values for log messages.
pub fn describe_allowed(allowed: &[String]) -> String {
    let shown: Vec<&str> = allowed.iter().take(SHOWN_VALUES).map(String::as_str).collect();
    let ellipsis = if allowed.len() > SHOWN_VALUES { "..." } else { "" };
    format!("{}{ellipsis}", shown.join(", "))
}
