//! The Postmark client and its request executor.
//!
//! # Design
//! `PostmarkClient` holds the base URL, the server token and a transport,
//! none of which change after construction. Every operation is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`; the operation method itself only glues
//! the two together through `dispatch`. The per-endpoint halves live in
//! `templates`, `email` and `bounces`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::ErrorEnvelope;

pub(crate) const TOKEN_HEADER: &str = "x-postmark-server-token";

/// Synchronous client for the Postmark HTTP API.
#[derive(Clone)]
pub struct PostmarkClient<T = UreqTransport> {
    base_url: String,
    server_token: String,
    transport: T,
}

impl PostmarkClient<UreqTransport> {
    /// Client over a pooled `ureq` agent honoring `config.timeout`.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new(config.timeout))
    }
}

impl<T> PostmarkClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            server_token: config.server_token.clone(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an authenticated JSON request for `path` (relative, leading `/`).
    pub(crate) fn build_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&B>,
    ) -> Result<HttpRequest, ApiError> {
        let body = payload
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Encoding(e.to_string()))?;
        Ok(self.assemble(method, path, body))
    }

    /// `build_request` for requests that never carry a body.
    pub(crate) fn build_bodyless(&self, method: HttpMethod, path: &str) -> HttpRequest {
        self.assemble(method, path, None)
    }

    fn assemble(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        headers.push((TOKEN_HEADER.to_string(), self.server_token.clone()));
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }
}

impl<T: Transport> PostmarkClient<T> {
    /// Run one request through the transport. No retries.
    pub(crate) fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(&request)?;
        tracing::debug!(status = response.status, url = %request.url, "received response");
        Ok(response)
    }
}

impl<T> fmt::Debug for PostmarkClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostmarkClient")
            .field("base_url", &self.base_url)
            .field("server_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Anything but 200 is a failure; keep the body for diagnostics.
pub(crate) fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    tracing::warn!(status = response.status, body = %response.body, "unexpected status");
    Err(ApiError::UnexpectedStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

pub(crate) fn decode<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decoding(e.to_string()))
}

/// Status check followed by JSON decoding.
pub(crate) fn parse_json<R: DeserializeOwned>(response: HttpResponse) -> Result<R, ApiError> {
    check_status(&response)?;
    decode(&response)
}

/// Turn a non-zero envelope code into `RemoteRejection`.
pub(crate) fn check_envelope(envelope: &ErrorEnvelope) -> Result<(), ApiError> {
    if envelope.error_code == 0 {
        return Ok(());
    }
    tracing::warn!(code = envelope.error_code, message = %envelope.message, "request rejected");
    Err(ApiError::RemoteRejection {
        code: envelope.error_code,
        message: envelope.message.clone(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn client() -> PostmarkClient<()> {
        let config = ClientConfig::new("tok-7f3a").with_base_url("http://localhost:3000");
        PostmarkClient::with_transport(&config, ())
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("tok-7f3a").with_base_url("http://localhost:3000/");
        let client = PostmarkClient::with_transport(&config, ());
        assert_eq!(client.base_url(), "http://localhost:3000");
        let req = client.build_bodyless(HttpMethod::Get, "/templates");
        assert_eq!(req.url, "http://localhost:3000/templates");
    }

    #[test]
    fn bodyless_request_has_auth_but_no_content_type() {
        let req = client().build_bodyless(HttpMethod::Delete, "/templates/1");
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert_eq!(req.header("X-Postmark-Server-Token"), Some("tok-7f3a"));
        assert_eq!(req.header("content-type"), None);
        assert!(req.body.is_none());
    }

    #[test]
    fn request_with_payload_sets_content_type() {
        let payload = serde_json::json!({"Name": "x"});
        let req = client()
            .build_request(HttpMethod::Post, "/templates", Some(&payload))
            .unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(r#"{"Name":"x"}"#));
    }

    #[test]
    fn non_200_keeps_status_and_body() {
        for status in [201, 204, 401, 422, 500] {
            let err = check_status(&HttpResponse::new(status, "raw body")).unwrap_err();
            match err {
                ApiError::UnexpectedStatus { status: s, body } => {
                    assert_eq!(s, status);
                    assert_eq!(body, "raw body");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_json_is_decoding_error() {
        let err = parse_json::<serde_json::Value>(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("tok-7f3a"));
        assert!(rendered.contains("<redacted>"));

        let req = client().build_bodyless(HttpMethod::Get, "/bounces");
        let rendered = format!("{req:?}");
        assert!(!rendered.contains("tok-7f3a"));
        assert!(rendered.contains("<redacted>"));
    }
}
