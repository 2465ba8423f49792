//! Typed HTTP client for the chat backend.
//!
//! [`ApiClient`] is constructed explicitly from an [`ApiConfig`] and passed
//! to whoever needs it; there is no ambient singleton and no interceptor
//! state. It wraps `reqwest` with the backend's conventions: JSON bodies,
//! non-success statuses mapped to [`ChatError::Transport`] carrying the
//! backend's `detail`/`message` field when one is present.
//!
//! Endpoint groups live in submodules: [`chat`] (single-shot and streaming
//! chat), [`sessions`] (session CRUD and history), [`documents`] (upload,
//! selection, embedding). Wire types are in [`types`].

pub mod chat;
pub mod documents;
pub mod sessions;
pub mod types;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ChatError;
use self::types::HealthResponse;

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    /// Timeout for plain request/response calls. Streaming requests are
    /// exempt: a reply may legitimately take longer than any fixed budget,
    /// and cancellation is the caller's lever there.
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Backend HTTP client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client, validating the base URL.
    pub fn new(config: &ApiConfig) -> Result<Self, ChatError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ChatError::Validation(format!("invalid base URL {base_url:?}: {e}")))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            timeout: config.timeout,
        })
    }

    /// Absolute URL for an endpoint path starting with `/`.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Check the backend's health endpoint.
    pub async fn health(&self) -> Result<HealthResponse, ChatError> {
        self.get("/health").await
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChatError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .timeout(self.timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ChatError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<(), ChatError> {
        let response = self
            .http
            .delete(self.endpoint(path))
            .timeout(self.timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Map a non-success response to [`ChatError::Transport`], pulling the
/// backend's error description out of the body when it has one. The body is
/// only read on failure; success responses pass through untouched.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = extract_detail(&body).unwrap_or(body);
    tracing::warn!(status = %status, detail = %detail, "backend request failed");
    Err(ChatError::Transport(format!("{status}: {detail}")))
}

/// Pull `detail` or `message` out of a JSON error body.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message"] {
        if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }
    None
}
