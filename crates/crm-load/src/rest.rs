//! HTTP transport against the REST API and Bulk API 2.0.

use std::time::Duration;

use crm_model::{LoadOperation, TargetRecord};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{ApiMessage, BulkApi, Connection, JobInfo, MetadataApi, RecordApi, ResultKind, SaveResult};
use crate::error::{LoadError, Result};

/// REST API version used for every endpoint.
pub const API_VERSION: &str = "v58.0";

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// An authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub instance_url: String,
    pub access_token: String,
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Supplies session tokens. Login flows live behind this seam.
pub trait TokenSource: Send {
    fn fetch(&mut self) -> Result<SessionToken>;
}

/// A fixed token, e.g. from configuration. Reconnecting returns the same
/// token, so an expired one fails on the retry.
#[derive(Debug, Clone)]
pub struct StaticToken(pub SessionToken);

impl TokenSource for StaticToken {
    fn fetch(&mut self) -> Result<SessionToken> {
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct CreatedJob {
    id: String,
}

pub struct RestConnection {
    client: Client,
    token: SessionToken,
    source: Box<dyn TokenSource>,
}

impl std::fmt::Debug for RestConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnection")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl RestConnection {
    /// Connect with a token from `source`.
    pub fn connect(mut source: Box<dyn TokenSource>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let token = source.fetch()?;
        info!(instance = %token.instance_url, "Connected");
        Ok(Self {
            client,
            token,
            source,
        })
    }

    pub fn instance_url(&self) -> &str {
        &self.token.instance_url
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/{API_VERSION}/{path}",
            self.token.instance_url.trim_end_matches('/')
        )
    }

    fn tooling_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/{API_VERSION}/tooling/{path}",
            self.token.instance_url.trim_end_matches('/')
        )
    }

    fn run_query(&self, endpoint: &str, soql: &str) -> Result<serde_json::Value> {
        debug!(%soql, "Executing query");
        let url = Url::parse_with_params(endpoint, &[("q", soql)])
            .map_err(|e| LoadError::InvalidResponse(e.to_string()))?;
        Ok(self.send(self.client.get(url))?.json()?)
    }

    fn job_url(&self, job_id: &str) -> String {
        self.data_url(&format!("jobs/ingest/{job_id}"))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token.access_token)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send()?;
        check_status(response)
    }

    fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        Ok(self.send(self.client.get(url))?.json()?)
    }

    fn set_job_state(&self, job_id: &str, state: &str) -> Result<()> {
        self.send(
            self.client
                .patch(self.job_url(job_id))
                .json(&json!({ "state": state })),
        )?;
        Ok(())
    }
}

/// Map error statuses to [`LoadError`]. 401 means the session expired.
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(LoadError::SessionExpired);
    }
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    Err(LoadError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Error text from a REST error body: the joined `message` entries when the
/// body is the usual error array, else the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Vec<ApiMessage>>(body) {
        Ok(messages) if !messages.is_empty() => SaveResult {
            errors: messages,
            ..SaveResult::default()
        }
        .error_text(),
        _ => body.trim().to_string(),
    }
}

impl Connection for RestConnection {
    fn reconnect(&mut self) -> Result<()> {
        info!("Attempting to reconnect");
        self.token = self.source.fetch()?;
        Ok(())
    }
}

impl MetadataApi for RestConnection {
    fn describe_global(&self) -> Result<serde_json::Value> {
        self.get_json(&self.data_url("sobjects/"))
    }

    fn describe_object(&self, object: &str) -> Result<serde_json::Value> {
        match self.get_json(&self.data_url(&format!("sobjects/{object}/describe/"))) {
            Err(LoadError::Api { status: 404, .. }) => Err(LoadError::ObjectNotFound(object.to_string())),
            other => other,
        }
    }

    fn query(&self, soql: &str) -> Result<serde_json::Value> {
        self.run_query(&self.data_url("query/"), soql)
    }

    fn tooling_query(&self, soql: &str) -> Result<serde_json::Value> {
        self.run_query(&self.tooling_url("query/"), soql)
    }
}

impl RecordApi for RestConnection {
    fn create(&self, object: &str, record: &TargetRecord) -> Result<SaveResult> {
        let url = self.data_url(&format!("sobjects/{object}/"));
        let response = self.authorized(self.client.post(url).json(record)).send()?;
        // Validation failures come back as 400 with an error array.
        if response.status() == StatusCode::BAD_REQUEST {
            let errors: Vec<ApiMessage> = response.json()?;
            return Ok(SaveResult {
                id: None,
                success: false,
                errors,
            });
        }
        Ok(check_status(response)?.json()?)
    }

    fn update(&self, object: &str, id: &str, record: &TargetRecord) -> Result<()> {
        let url = self.data_url(&format!("sobjects/{object}/{id}"));
        self.send(self.client.patch(url).json(record))?;
        Ok(())
    }
}

impl BulkApi for RestConnection {
    fn create_job(&self, object: &str, operation: LoadOperation) -> Result<String> {
        info!(object, %operation, "Creating bulk job");
        let body = json!({
            "object": object,
            "operation": operation.as_str(),
            "contentType": "CSV",
            "lineEnding": "LF",
        });
        let job: CreatedJob = self
            .send(self.client.post(self.data_url("jobs/ingest")).json(&body))?
            .json()?;
        Ok(job.id)
    }

    fn upload_batch(&self, job_id: &str, csv: &str) -> Result<()> {
        debug!(job_id, bytes = csv.len(), "Uploading batch");
        self.send(
            self.client
                .put(format!("{}/batches", self.job_url(job_id)))
                .header(CONTENT_TYPE, "text/csv")
                .body(csv.to_string()),
        )?;
        Ok(())
    }

    fn close_job(&self, job_id: &str) -> Result<()> {
        self.set_job_state(job_id, "UploadComplete")
    }

    fn job_status(&self, job_id: &str) -> Result<JobInfo> {
        Ok(self.send(self.client.get(self.job_url(job_id)))?.json()?)
    }

    fn fetch_results(&self, job_id: &str, kind: ResultKind) -> Result<String> {
        let url = format!("{}/{}/", self.job_url(job_id), kind.path());
        let response = self.authorized(self.client.get(url)).send()?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(LoadError::SessionExpired);
        }
        if !response.status().is_success() {
            warn!(job_id, status = response.status().as_u16(), kind = kind.path(), "No results returned");
            return Ok(String::new());
        }
        Ok(response.text()?)
    }

    fn abort_job(&self, job_id: &str) -> Result<()> {
        self.set_job_state(job_id, "Aborted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> RestConnection {
        RestConnection::connect(Box::new(StaticToken(SessionToken {
            instance_url: "https://example.my.salesforce.com/".to_string(),
            access_token: "00D-secret".to_string(),
        })))
        .expect("client builds")
    }

    #[test]
    fn endpoints_are_versioned() {
        let conn = connection();
        assert_eq!(
            conn.data_url("sobjects/"),
            "https://example.my.salesforce.com/services/data/v58.0/sobjects/"
        );
        assert_eq!(
            conn.tooling_url("query/"),
            "https://example.my.salesforce.com/services/data/v58.0/tooling/query/"
        );
        assert_eq!(
            conn.job_url("750X"),
            "https://example.my.salesforce.com/services/data/v58.0/jobs/ingest/750X"
        );
    }

    #[test]
    fn token_is_not_printed() {
        assert!(!format!("{:?}", connection()).contains("00D-secret"));
    }

    #[test]
    fn error_bodies_are_summarized() {
        assert_eq!(
            error_message(r#"[{"message": "Invalid field", "errorCode": "INVALID_FIELD"}]"#),
            "Invalid field"
        );
        assert_eq!(error_message("  Service Unavailable \n"), "Service Unavailable");
    }
}
