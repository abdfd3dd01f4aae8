//! HTTP clients for the supported completion providers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::LlmClient;
use crate::error::LlmError;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

const CLAUDE_BASE_URL: &str = "https://api.anthropic.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

const MAX_TOKENS: u32 = 4096;

/// Completion requests can take a while for large batches.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Claude,
    #[serde(rename = "openai")]
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Claude => "claude",
            LlmProvider::OpenAi => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Claude => DEFAULT_CLAUDE_MODEL,
            LlmProvider::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Claude => CLAUDE_BASE_URL,
            LlmProvider::OpenAi => OPENAI_BASE_URL,
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(LlmProvider::Claude),
            "openai" | "gpt" => Ok(LlmProvider::OpenAi),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

fn build_http_client(headers: HeaderMap) -> Result<Client, LlmError> {
    Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LlmError::Network(format!("failed to create HTTP client: {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue, LlmError> {
    HeaderValue::from_str(value)
        .map_err(|e| LlmError::Network(format!("invalid header value: {e}")))
}

/// Turn a non-success response into an [`LlmError::Api`].
fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Client for the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    http: Client,
    base_url: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, model: Option<&str>, base_url: Option<&str>) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", header_value(api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: build_http_client(headers)?,
            base_url: base_url.unwrap_or(CLAUDE_BASE_URL).trim_end_matches('/').to_string(),
            model: model.unwrap_or(DEFAULT_CLAUDE_MODEL).to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmClient for ClaudeClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        tracing::debug!(model = %self.model, "Requesting Claude completion");

        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = check_status(self.http.post(&url).json(&body).send()?)?;
        let payload: Value = response.json()?;
        claude_text(&payload)
    }
}

fn claude_text(payload: &Value) -> Result<String, LlmError> {
    payload
        .get("content")
        .and_then(|content| content.get(0))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(LlmError::EmptyCompletion)
}

/// Client for the OpenAI chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: Option<&str>, base_url: Option<&str>) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            header_value(&format!("Bearer {api_key}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: build_http_client(headers)?,
            base_url: base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/').to_string(),
            model: model.unwrap_or(DEFAULT_OPENAI_MODEL).to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmClient for OpenAiClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, "Requesting OpenAI completion");

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = check_status(self.http.post(&url).json(&body).send()?)?;
        let payload: Value = response.json()?;
        openai_text(&payload)
    }
}

fn openai_text(payload: &Value) -> Result<String, LlmError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(LlmError::EmptyCompletion)
}

/// Build the client for `provider`.
pub fn build_client(
    provider: LlmProvider,
    api_key: &str,
    model: Option<&str>,
    base_url: Option<&str>,
) -> Result<Box<dyn LlmClient>, LlmError> {
    Ok(match provider {
        LlmProvider::Claude => Box::new(ClaudeClient::new(api_key, model, base_url)?),
        LlmProvider::OpenAi => Box::new(OpenAiClient::new(api_key, model, base_url)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parsing() {
        assert_eq!("Claude".parse::<LlmProvider>().unwrap(), LlmProvider::Claude);
        assert_eq!("openai".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert!(matches!(
            "llama".parse::<LlmProvider>(),
            Err(LlmError::UnknownProvider(name)) if name == "llama"
        ));
        assert_eq!(LlmProvider::OpenAi.default_model(), "gpt-4");
    }

    #[test]
    fn completion_text_extraction() {
        let claude = json!({"content": [{"type": "text", "text": "[]"}]});
        assert_eq!(claude_text(&claude).unwrap(), "[]");
        assert!(matches!(claude_text(&json!({"content": []})), Err(LlmError::EmptyCompletion)));

        let openai = json!({"choices": [{"message": {"role": "assistant", "content": "[1]"}}]});
        assert_eq!(openai_text(&openai).unwrap(), "[1]");
        assert!(openai_text(&json!({})).is_err());
    }

    #[test]
    fn clients_use_defaults() {
        let client = ClaudeClient::new("key", None, Some("http://localhost:9/")).unwrap();
        assert_eq!(client.model(), DEFAULT_CLAUDE_MODEL);
        assert_eq!(client.base_url, "http://localhost:9");
        let client = OpenAiClient::new("key", Some("gpt-4o"), None).unwrap();
        assert_eq!(client.model(), "gpt-4o");
    }
}
