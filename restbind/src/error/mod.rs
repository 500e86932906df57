//! Layered error types.
//!
//! The hierarchy is rooted at [`ApiError`], which every bound call returns:
//! - [`ConfigError`] - Construction-time declaration and configuration errors
//! - [`ClientError`] - Transport failures other than timeouts
//! - [`HttpError`] - Non-2xx responses under the default status policy
//! - [`ValidationError`] - Body decoding and schema violations
//! - [`ValidatorError`] - Failures raised by user validators

mod api_error;
mod client_error;
mod config_error;
mod http_error;
mod validation_error;
mod validator_error;

pub use api_error::ApiError;
pub use client_error::ClientError;
pub use config_error::ConfigError;
pub use http_error::HttpError;
pub use validation_error::{FieldError, ValidationError};
pub use validator_error::ValidatorError;
