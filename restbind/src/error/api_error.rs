//! Top-level error type returned by bound calls.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use super::validation_error::summarize;
use super::{ClientError, ConfigError, FieldError, HttpError, ValidationError, ValidatorError};
use crate::validator::ValidatorMode;

/// Top-level error type for all endpoint calls.
///
/// Every failure a call can produce is classified into exactly one variant.
/// Failures before the transport is invoked are `Config`, `MissingParameter`,
/// `RequestValidation` or `Validator`; failures after it are `Http`,
/// `ResponseValidation`, `Timeout` or `Client`.
///
/// ## Examples
///
/// ```rust,ignore
/// use restbind::ApiError;
///
/// fn handle_error(err: ApiError) {
///     match err {
///         ApiError::Http(e) => eprintln!("Server said {}: {}", e.status, e.body_text()),
///         ApiError::Timeout { after } => eprintln!("Gave up after {after:?}"),
///         other => eprintln!("{other}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// Declaration or configuration errors.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Required path tokens were not supplied.
    #[error("Missing required path parameters for {endpoint}: {}", .names.join(", "))]
    MissingParameter {
        /// The endpoint being called.
        endpoint: String,
        /// Every missing token, in template order.
        names: Vec<String>,
    },

    /// Query parameters or request body failed validation.
    #[error("Request validation failed for {endpoint}: {}", summarize(.errors))]
    RequestValidation {
        /// The endpoint being called.
        endpoint: String,
        /// Field-level detail.
        errors: Vec<FieldError>,
        /// The payload that failed validation.
        raw: Option<serde_json::Value>,
    },

    /// A before or after validator rejected the call.
    #[error("{mode} validator for {endpoint} failed: {source}")]
    Validator {
        /// The endpoint being called.
        endpoint: String,
        /// Which stage raised the error.
        mode: ValidatorMode,
        /// The validator's error.
        #[source]
        source: ValidatorError,
    },

    /// The server answered with a non-success status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A successful response did not match the declared response type.
    #[error("Response validation failed (HTTP {status}): {source}")]
    ResponseValidation {
        /// The HTTP status code returned.
        status: u16,
        /// The raw body, for diagnostics.
        body: Bytes,
        /// The decode or schema failure.
        #[source]
        source: ValidationError,
    },

    /// The effective deadline elapsed before a response arrived.
    #[error("Request timeout after {}ms", .after.as_millis())]
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },

    /// Transport failure other than a timeout.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ApiError {
    /// Returns `true` if this error could be resolved by retrying the call.
    ///
    /// Only meaningful to wrap validators that implement retries; the engine
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_retryable(),
            Self::Client(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the HTTP status code if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status),
            Self::ResponseValidation { status, .. } => Some(*status),
            Self::Client(ClientError::Request(e)) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the error was raised before anything was sent.
    pub fn is_pre_send(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingParameter { .. }
                | Self::RequestValidation { .. }
                | Self::Validator {
                    mode: ValidatorMode::Before,
                    ..
                }
        )
    }

    /// Field-level detail for request and response validation failures.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::RequestValidation { errors, .. } => errors.clone(),
            Self::ResponseValidation { source, .. } => source.field_errors(),
            _ => Vec::new(),
        }
    }
}
