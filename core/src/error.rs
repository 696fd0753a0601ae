//! Error types for the Postmark API client.
//!
//! # Design
//! Every failure propagates to the caller unchanged; the client never
//! retries or suppresses. `UnexpectedStatus` keeps the raw status code and
//! body text so callers can inspect whatever the provider sent back.
//! `RemoteRejection` covers HTTP 200 responses whose error envelope carries
//! a non-zero code.

use serde::Deserialize;

/// Postmark's error code for an unknown or invalid template id.
pub const TEMPLATE_NOT_FOUND: i64 = 1101;

/// Errors returned by `PostmarkClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encoding(String),

    /// DNS, connect, TLS, timeout or body-read failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a status other than 200.
    #[error("unexpected status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("failed to decode response: {0}")]
    Decoding(String),

    /// HTTP 200, but the error envelope reports a non-zero code.
    #[error("request rejected by provider (code {code}): {message}")]
    RemoteRejection { code: i64, message: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorCodeOnly {
    error_code: i64,
}

impl ApiError {
    /// Whether the failure means the addressed resource does not exist.
    ///
    /// Postmark reports unknown templates as 422 with code 1101 in the body,
    /// so the body of an unexpected status is inspected as well.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::UnexpectedStatus { status: 404, .. } => true,
            ApiError::UnexpectedStatus { body, .. } => serde_json::from_str::<ErrorCodeOnly>(body)
                .map(|parsed| parsed.error_code == TEMPLATE_NOT_FOUND)
                .unwrap_or(false),
            ApiError::RemoteRejection { code, .. } => *code == TEMPLATE_NOT_FOUND,
            _ => false,
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Only classifies; the client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
