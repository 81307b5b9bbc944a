//! reqwest-backed transport.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, IF_MATCH};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::{ApiRequest, Transport};
use crate::config::ClientConfig;
use crate::error::{ApiErrorBody, OrderError};

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest raw error body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// HTTP transport for the order API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

struct HttpTransportInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport from client configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, OrderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| OrderError::Config(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpTransportInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve request segments against the base URL, percent-encoding each one.
    fn url_for(&self, request: &ApiRequest) -> Result<Url, OrderError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| OrderError::Config("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(&request.segments);
        Ok(url)
    }

    /// Turn a non-success response into an error.
    async fn error_for(status: StatusCode, response: reqwest::Response) -> OrderError {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| fallback_message(status, &body));

        match status {
            StatusCode::NOT_FOUND => OrderError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OrderError::Unauthorized(message),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => OrderError::Conflict(message),
            _ => OrderError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl Transport for HttpTransport {
    #[instrument(
        skip(self, request),
        fields(
            method = %request.method,
            path = %request.path(),
            request_id = tracing::field::Empty
        )
    )]
    async fn send(&self, request: ApiRequest) -> Result<Option<Value>, OrderError> {
        let url = self.url_for(&request)?;
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(version) = &request.if_match {
            builder = builder.header(IF_MATCH, format!("\"{version}\""));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "Order API responded");

        if !status.is_success() {
            return Err(Self::error_for(status, response).await);
        }

        let bytes = response.bytes().await?;
        parse_body(&bytes)
    }
}

/// Parse a success body; empty bodies and JSON `null` mean "no data".
fn parse_body(bytes: &[u8]) -> Result<Option<Value>, OrderError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| OrderError::Parse(format!("Failed to parse response: {e}")))?;

    Ok((!value.is_null()).then_some(value))
}

/// Message for error bodies that are not JSON.
fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
