//! Transport abstraction for the order API.
//!
//! [`OrderClient`](crate::OrderClient) never talks HTTP directly; it builds an
//! [`ApiRequest`] and hands it to a [`Transport`]. [`HttpTransport`] is the
//! production implementation. With the `mock` feature, [`MockTransport`]
//! scripts responses and records requests for tests.

mod http;
#[cfg(any(test, feature = "mock"))]
mod mock;

use std::future::Future;
use std::sync::Arc;

pub use http::HttpTransport;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
pub use reqwest::Method;
use serde_json::Value;

use crate::error::OrderError;

/// A single request against the order API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Unencoded path segments (e.g. `["api", "orders", "<id>", "status"]`).
    pub segments: Vec<String>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Version the caller expects the order to be at.
    pub if_match: Option<String>,
}

impl ApiRequest {
    /// Create a request without a body.
    #[must_use]
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            body: None,
            if_match: None,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach an expected version, sent as `If-Match`.
    #[must_use]
    pub fn with_if_match(mut self, version: Option<String>) -> Self {
        self.if_match = version;
        self
    }

    /// Path for logging and matching (segments joined, not percent-encoded).
    #[must_use]
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// Sends [`ApiRequest`]s and returns the decoded JSON body.
///
/// Implementations return `Ok(None)` when the server answered with a success
/// status but no body (or a JSON `null`), and map every other outcome onto
/// [`OrderError`]. They must not retry.
pub trait Transport: Send + Sync {
    /// Send one request.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<Option<Value>, OrderError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<Option<Value>, OrderError>> + Send {
        (**self).send(request)
    }
}

impl<T: Transport> Transport for &T {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<Option<Value>, OrderError>> + Send {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_path() {
        let request = ApiRequest::new(Method::PUT, ["api", "orders", "abc123", "status"]);
        assert_eq!(request.path(), "/api/orders/abc123/status");
        assert!(request.body.is_none());
        assert!(request.if_match.is_none());
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::new(Method::POST, ["api", "orders"])
            .with_body(serde_json::json!({"items": []}))
            .with_if_match(Some("3".to_string()));
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body, Some(serde_json::json!({"items": []})));
        assert_eq!(request.if_match.as_deref(), Some("3"));
    }
}
