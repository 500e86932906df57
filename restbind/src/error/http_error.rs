//! Non-success HTTP status errors.

use bytes::Bytes;
use thiserror::Error;

/// Raised when the server answers with a non-2xx status.
///
/// Carries the raw body undecoded, since a failing status usually comes
/// with a body that does not match the endpoint's declared type.
#[derive(Debug, Clone, Error)]
#[error("HTTP {status} from {url}: {}", self.body_text())]
pub struct HttpError {
    /// The HTTP status code returned.
    pub status: u16,
    /// The final request URL.
    pub url: String,
    /// The raw response body.
    pub body: Bytes,
}

impl HttpError {
    pub fn new(status: u16, url: impl Into<String>, body: Bytes) -> Self {
        Self {
            status,
            url: url.into(),
            body,
        }
    }

    /// Returns the body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns `true` for 4xx statuses.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Returns `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Returns `true` if retrying could succeed (5xx or 429).
    pub fn is_retryable(&self) -> bool {
        self.is_server_error() || self.status == 429
    }
}
