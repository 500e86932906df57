//! The network seam.
//!
//! A transport takes a finished [`RequestSpec`] and returns a
//! [`RawResponse`]. It never decodes bodies or interprets status codes; the
//! dispatcher does both. [`ReqwestBlockingTransport`] and
//! [`ReqwestTransport`] are the stock implementations; tests and embedders
//! can supply their own.

mod reqwest_async;
mod reqwest_blocking;

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

use crate::error::{ApiError, ClientError};
use crate::request::RequestSpec;
use crate::response::RawResponse;

pub use reqwest_async::ReqwestTransport;
pub use reqwest_blocking::ReqwestBlockingTransport;

/// How a send failed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// No connection could be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// reqwest reported a failure.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// Anything else a custom transport wants to report.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Classifies the failure for callers. `after` is the deadline that
    /// was in force.
    pub(crate) fn into_api_error(self, after: Duration) -> ApiError {
        match self {
            Self::Timeout => ApiError::Timeout { after },
            Self::Request(e) if e.is_timeout() => ApiError::Timeout { after },
            Self::Request(e) => ClientError::Request(e).into(),
            Self::Connect(message) => ClientError::Connection(message).into(),
            Self::Other(e) => ClientError::Other(e).into(),
        }
    }
}

/// Sends requests on the calling thread.
pub trait BlockingTransport: Send + Sync {
    fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError>;
}

/// Sends requests asynchronously.
pub trait AsyncTransport: Send + Sync {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> BoxFuture<'a, Result<RawResponse, TransportError>>;
}

/// Converts the request's header pairs for reqwest.
pub(crate) fn header_map(request: &RequestSpec) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    for (name, value) in request.header_pairs() {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransportError::Other(Box::new(e)))?;
        let value = HeaderValue::from_str(&value).map_err(|e| TransportError::Other(Box::new(e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
