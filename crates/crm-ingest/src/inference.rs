//! Column type inference from sampled values.
//!
//! Checks run in priority order (date, number, boolean) and a type wins when
//! more than 80% of the non-blank samples match it.

use std::sync::LazyLock;

use crm_model::InferredType;
use regex::Regex;

const MATCH_RATIO: f64 = 0.8;

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "yes", "no", "1", "0", "t", "f", "y", "n"];

static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4}|\d{2}-\d{2}-\d{4}|\d{4}/\d{2}/\d{2})")
        .expect("valid regex")
});

/// Infer a column type from its sampled cells. Blank cells are ignored; a
/// column with no other cells is a string.
pub fn infer_type(values: &[&str]) -> InferredType {
    let non_empty: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| !v.trim().is_empty())
        .collect();
    if non_empty.is_empty() {
        return InferredType::String;
    }

    let exceeds = |check: fn(&str) -> bool| {
        let hits = non_empty.iter().filter(|v| check(v)).count();
        hits as f64 / non_empty.len() as f64 > MATCH_RATIO
    };

    if exceeds(is_date) {
        InferredType::Date
    } else if exceeds(is_number) {
        InferredType::Number
    } else if exceeds(is_boolean) {
        InferredType::Boolean
    } else {
        InferredType::String
    }
}

/// Starts with a `YYYY-MM-DD`, `MM/DD/YYYY`, `MM-DD-YYYY` or `YYYY/MM/DD` date.
pub fn is_date(value: &str) -> bool {
    DATE_PREFIX.is_match(value.trim())
}

/// Parses as a float once thousands separators and `$` are removed.
pub fn is_number(value: &str) -> bool {
    let cleaned = value.replace([',', '$'], "");
    cleaned.trim().parse::<f64>().is_ok()
}

pub fn is_boolean(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    BOOLEAN_TOKENS.contains(&lowered.as_str())
}
