//! Declaration and configuration errors.

use thiserror::Error;

use crate::endpoint_id::EndpointIdError;

/// Errors in client, resource or endpoint declarations.
///
/// These are raised while declaring or constructing, never while a call is
/// in flight, so a misconfigured client fails before any request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A required configuration field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A raw configuration mapping could not be normalized.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[source] serde_json::Error),

    /// Endpoint or resource identifier validation failed.
    #[error("Invalid endpoint ID: {0}")]
    InvalidEndpointId(#[from] EndpointIdError),

    /// Path template contains invalid parameter syntax.
    #[error("Invalid path template '{template}': {message}")]
    InvalidPathTemplate {
        /// The offending template.
        template: String,
        /// Description of the problem.
        message: String,
    },

    /// A header name or value cannot be sent over HTTP.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// The header name as declared.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// Two endpoints with the same ID were declared on one owner.
    #[error("Duplicate endpoint ID: {id}")]
    DuplicateEndpoint {
        /// The duplicate endpoint ID.
        id: String,
    },

    /// Two resources with the same ID were attached to one client.
    #[error("Duplicate resource ID: {id}")]
    DuplicateResource {
        /// The duplicate resource ID.
        id: String,
    },

    /// A validator or binding referenced an endpoint the owner does not declare.
    #[error("Endpoint '{id}' is not declared on {owner}")]
    UnknownEndpoint {
        /// The owner that was searched (client or resource id).
        owner: String,
        /// The endpoint ID that was not found.
        id: String,
    },

    /// A resource lookup named a resource the client does not declare.
    #[error("Resource '{id}' is not declared on this client")]
    UnknownResource {
        /// The resource ID that was not found.
        id: String,
    },

    /// An endpoint was bound with a response type other than the declared one.
    #[error("Endpoint '{id}' is declared with a different response type")]
    EndpointTypeMismatch {
        /// The endpoint ID.
        id: String,
    },

    /// More than one wrap validator was registered for one endpoint.
    #[error("Endpoint '{id}' already has a wrap validator")]
    DuplicateWrap {
        /// The endpoint ID.
        id: String,
    },
}

impl ConfigError {
    /// Creates a missing field error.
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an invalid path template error.
    pub fn invalid_path(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPathTemplate {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
