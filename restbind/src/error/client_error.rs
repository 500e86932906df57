//! Transport failures surfaced to callers.

use thiserror::Error;

/// Errors from the transport layer that are not timeouts.
///
/// Timeouts are classified separately as [`ApiError::Timeout`](super::ApiError::Timeout)
/// so they are never conflated with connection or protocol failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed due to network or protocol error.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to establish connection to the server.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A custom transport reported a failure.
    #[error("Transport failed: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ClientError {
    /// Returns `true` if retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Request(e) => e.is_connect(),
            Self::Other(_) => false,
        }
    }
}
