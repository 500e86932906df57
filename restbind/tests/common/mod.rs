//! Common test utilities for pipeline integration tests.
//!
//! Provides an in-memory transport that counts sends, records every request
//! it receives and answers with a canned response.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use restbind::{AsyncTransport, BlockingTransport, ClientConfig, RawResponse, RequestSpec, TransportError};

pub const BASE_URL: &str = "https://api.example.com";

/// Answers every send with the same status and body.
#[derive(Debug)]
pub struct MockTransport {
    status: u16,
    body: Bytes,
    content_type: Option<&'static str>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RequestSpec>>,
}

impl MockTransport {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: Bytes::from(body.to_string()),
            content_type: Some("application/json"),
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(status: u16, body: &'static str) -> Self {
        Self {
            body: Bytes::from_static(body.as_bytes()),
            content_type: Some("text/plain"),
            ..Self::json(status, serde_json::Value::Null)
        }
    }

    /// Async sends sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request.
    ///
    /// ## Panics
    ///
    /// Panics if nothing has been sent.
    pub fn last_request(&self) -> RequestSpec {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn respond(&self, request: &RequestSpec) -> RawResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let mut headers = HeaderMap::new();
        if let Some(content_type) = self.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        RawResponse {
            status: self.status,
            headers,
            url: request.full_url(),
            elapsed: Duration::from_millis(1),
            body: self.body.clone(),
        }
    }
}

impl BlockingTransport for MockTransport {
    fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        Ok(self.respond(request))
    }
}

impl AsyncTransport for MockTransport {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.respond(request))
        }
        .boxed()
    }
}

/// Shares a mock as a blocking transport.
pub fn blocking(mock: &Arc<MockTransport>) -> Arc<dyn BlockingTransport> {
    mock.clone()
}

/// Shares a mock as an async transport.
pub fn suspending(mock: &Arc<MockTransport>) -> Arc<dyn AsyncTransport> {
    mock.clone()
}

pub fn config() -> ClientConfig {
    ClientConfig::new(BASE_URL).unwrap()
}
