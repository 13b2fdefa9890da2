//! Shared plumbing for outbound HTTP calls to HubSpot and Bullhorn.
//!
//! Every outbound call goes through [`send`], which turns transport failures and non-success
//! statuses into an [`UpstreamError`] after logging the status and response body.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The remote answered with a non-success status
    #[error("{operation} failed ({status}): {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The request never produced a response. The URL is stripped, since its query can carry
    /// session tokens and login credentials.
    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A success response that does not carry what we need
    #[error("{operation} returned an unexpected response: {message}")]
    InvalidResponse { operation: &'static str, message: String },

    #[error("Missing Bullhorn session details")]
    MissingSession,

    #[error("Missing Bullhorn OAuth configuration")]
    MissingOAuthConfig,

    #[error("Bullhorn headless auth redirect missing code (status {})", describe_status(.status))]
    MissingAuthCode { status: Option<u16> },
}

fn describe_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

impl UpstreamError {
    pub fn transport(operation: &'static str, source: reqwest::Error) -> Self {
        UpstreamError::Transport {
            operation,
            source: source.without_url(),
        }
    }

    /// HTTP status of the failed call, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(status.as_u16()),
            UpstreamError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            UpstreamError::MissingAuthCode { status } => *status,
            _ => None,
        }
    }

    /// 401 or 403 from the remote.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// The `error` member of an OAuth-style JSON error body (e.g. `invalid_grant`).
    pub fn oauth_error(&self) -> Option<String> {
        let UpstreamError::Status { body, .. } = self else {
            return None;
        };
        let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
        parsed.get("error")?.as_str().map(str::to_string)
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Send a request, failing on transport errors and non-success statuses.
pub async fn send(request: RequestBuilder, operation: &'static str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|source| UpstreamError::transport(operation, source))?;
    check(response, operation).await
}

/// Pass a success response through; read, log and wrap anything else.
pub async fn check(response: Response, operation: &'static str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(failure(response, operation).await)
    }
}

/// Consume a response the caller has decided is a failure.
pub async fn failure(response: Response, operation: &'static str) -> UpstreamError {
    let status = response.status();
    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(operation, status = status.as_u16(), path = %path, body = %body, "Upstream request failed");
    UpstreamError::Status { operation, status, body }
}

/// Decode a JSON body, keeping the raw text in the logs when it does not match `T`.
pub async fn json<T: DeserializeOwned>(response: Response, operation: &'static str) -> Result<T> {
    let body_text = response
        .text()
        .await
        .map_err(|source| UpstreamError::transport(operation, source))?;

    serde_json::from_str::<T>(&body_text).map_err(|e| {
        tracing::error!(operation, error = %e, body = %body_text, "Failed to parse upstream response");
        UpstreamError::InvalidResponse {
            operation,
            message: format!("error decoding response body: {e}"),
        }
    })
}
