//! Authenticated HTTP access to the Toggl Track v9 API.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.track.toggl.com/api/v9";
/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provided API token was invalid.
    #[error("invalid API token: {reason}")]
    InvalidApiToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Connection-level failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned a non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    /// Response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single authenticated request against the API.
///
/// An empty or `null` body resolves to [`Value::Null`].
pub trait TogglApi {
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// Toggl Track API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the public API with the default timeout.
    pub fn new(api_token: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_options(api_token, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client against a specific API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, or if the
    /// HTTP client fails to build.
    pub fn with_options(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(ApiError::InvalidApiToken {
                reason: "API token cannot be empty",
            });
        }
        if api_token.trim().is_empty() {
            return Err(ApiError::InvalidApiToken {
                reason: "API token cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::ClientBuild)?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl TogglApi for Client {
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ApiError> {
        let response = self
            .http
            .request(method, self.url(path))
            .basic_auth(&self.api_token, Some("api_token"))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }

        parse_body(&body)
    }
}

fn parse_body(body: &str) -> Result<Value, ApiError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}
