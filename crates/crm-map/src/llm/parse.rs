//! Tolerant parsing of LLM mapping responses.
//!
//! Models wrap JSON in markdown fences, add prose around it and leave
//! trailing commas. Anything that still fails to decode yields no mappings.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use crm_model::{MappingCandidate, MatchMethod, TargetObject};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));

/// One suggestion as returned by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmSuggestion {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Pull the JSON array text out of a raw completion.
///
/// Returns `None` when no bracketed array can be found.
pub fn extract_json_array(response: &str) -> Option<String> {
    let mut text = response.trim();

    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        text = body.find("```").map_or(body, |end| &body[..end]).trim();
    } else if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        text = body.find("```").map_or(body, |end| &body[..end]).trim();
    }

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    text = &text[start..=end];

    Some(
        text.replace(",}", "}")
            .replace(", }", "}")
            .replace(",]", "]")
            .replace(", ]", "]"),
    )
}

/// Decode a completion into raw suggestions, repairing it when possible.
pub fn decode_suggestions(response: &str) -> Vec<LlmSuggestion> {
    let Some(json_text) = extract_json_array(response) else {
        warn!("No JSON array found in LLM response");
        debug!(response = %truncate(response, 500), "LLM response");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<LlmSuggestion>>(&json_text) {
        Ok(suggestions) => suggestions,
        Err(first) => {
            warn!(error = %first, "First parse attempt failed, retrying after cleanup");
            let cleaned = TRAILING_COMMA.replace_all(&json_text, "$1");
            match serde_json::from_str::<Vec<LlmSuggestion>>(&cleaned) {
                Ok(suggestions) => suggestions,
                Err(error) => {
                    warn!(%error, text = %truncate(&cleaned, 1000), "Failed to parse LLM response as JSON");
                    Vec::new()
                }
            }
        }
    }
}

/// Turn a completion into candidates for the given batch of columns.
///
/// Suggestions below `threshold`, naming an unknown field, or naming a column
/// outside the batch are dropped.
pub fn parse_llm_response(
    response: &str,
    columns: &BTreeSet<&str>,
    object: &TargetObject,
    threshold: f64,
) -> Vec<MappingCandidate> {
    let mut candidates = Vec::new();
    for suggestion in decode_suggestions(response) {
        let confidence = suggestion.confidence.unwrap_or(0.0);
        if confidence < threshold {
            continue;
        }
        let target = suggestion.target.unwrap_or_default();
        if !object.has_field(&target) {
            warn!(target = %target, "LLM suggested unknown field");
            continue;
        }
        let source = suggestion.source.unwrap_or_default();
        if !columns.contains(source.as_str()) {
            warn!(source = %source, "LLM suggested unknown column");
            continue;
        }
        candidates.push(
            MappingCandidate::new(source, target, confidence.min(1.0), MatchMethod::Llm)
                .with_reasoning(suggestion.reasoning.filter(|r| !r.is_empty())),
        );
    }
    candidates
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_model::{FieldType, TargetField};

    fn object() -> TargetObject {
        TargetObject::new(
            "Account",
            "Account",
            vec![
                TargetField::new("Phone", "Account Phone", FieldType::Phone),
                TargetField::new("AnnualRevenue", "Annual Revenue", FieldType::Currency),
            ],
        )
    }

    fn columns() -> BTreeSet<&'static str> {
        ["tel", "rev"].into_iter().collect()
    }

    #[test]
    fn fenced_response_is_parsed() {
        let response = "Here you go:\n```json\n[{\"source\": \"tel\", \"target\": \"Phone\", \"confidence\": 0.9, \"reasoning\": \"tel = telephone\"}]\n```\nDone.";
        let parsed = parse_llm_response(response, &columns(), &object(), 0.6);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].target_field, "Phone");
        assert_eq!(parsed[0].method, MatchMethod::Llm);
        assert_eq!(parsed[0].reasoning.as_deref(), Some("tel = telephone"));
    }

    #[test]
    fn plain_fence_and_surrounding_prose() {
        let response = "```\n[{\"source\": \"rev\", \"target\": \"AnnualRevenue\", \"confidence\": 0.8}]\n```";
        assert_eq!(parse_llm_response(response, &columns(), &object(), 0.6).len(), 1);

        let response = "Sure! [{\"source\": \"rev\", \"target\": \"AnnualRevenue\", \"confidence\": 0.8}] Hope this helps.";
        assert_eq!(parse_llm_response(response, &columns(), &object(), 0.6).len(), 1);
    }

    #[test]
    fn prose_after_the_array_is_ignored() {
        let response = "[{\"source\":\"tel\",\"target\":\"Phone\",\"confidence\":0.9}]\nLet me know if you need anything else.";
        let parsed = parse_llm_response(response, &columns(), &object(), 0.6);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].source_column, "tel");

        assert_eq!(
            extract_json_array("[{\"source\": \"tel\"}]\nThanks!").as_deref(),
            Some("[{\"source\": \"tel\"}]")
        );
    }

    #[test]
    fn trailing_commas_are_repaired() {
        let response = "[{\"source\": \"tel\", \"target\": \"Phone\", \"confidence\": 0.9,},]";
        assert_eq!(parse_llm_response(response, &columns(), &object(), 0.6).len(), 1);

        // Newline before the closing brace needs the regex pass.
        let response = "[\n  {\"source\": \"tel\", \"target\": \"Phone\", \"confidence\": 0.9,\n  },\n]";
        assert_eq!(parse_llm_response(response, &columns(), &object(), 0.6).len(), 1);
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(parse_llm_response("I cannot help with that.", &columns(), &object(), 0.6).is_empty());
        assert!(parse_llm_response("[{\"source\": }", &columns(), &object(), 0.6).is_empty());
        assert!(parse_llm_response("] backwards [", &columns(), &object(), 0.6).is_empty());
        assert!(parse_llm_response("[]", &columns(), &object(), 0.6).is_empty());
    }

    #[test]
    fn unknown_targets_and_low_confidence_are_dropped() {
        let response = r#"[
            {"source": "tel", "target": "Fax", "confidence": 0.9},
            {"source": "rev", "target": "AnnualRevenue", "confidence": 0.4},
            {"source": "rev", "target": "AnnualRevenue"},
            {"source": "other", "target": "Phone", "confidence": 0.9}
        ]"#;
        assert!(parse_llm_response(response, &columns(), &object(), 0.6).is_empty());
    }
}
