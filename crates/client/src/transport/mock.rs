//! Scripted in-memory transport.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{ApiRequest, Transport};
use crate::error::OrderError;

/// Transport that replays queued responses and records every request.
///
/// Responses are consumed in FIFO order. Sending with an empty queue yields an
/// [`OrderError::Api`] with status 599 so a missing script fails loudly.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Option<Value>, OrderError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    /// Create a transport with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON body.
    pub fn respond_with(&self, body: Value) -> &Self {
        lock(&self.responses).push_back(Ok(Some(body)));
        self
    }

    /// Queue a success status without a body.
    pub fn respond_empty(&self) -> &Self {
        lock(&self.responses).push_back(Ok(None));
        self
    }

    /// Queue a failure.
    pub fn fail_with(&self, error: OrderError) -> &Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// Requests sent so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<ApiRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<Option<Value>, OrderError> {
        lock(&self.requests).push(request);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| {
                Err(OrderError::Api {
                    status: 599,
                    message: "no scripted response".to_string(),
                })
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
