use thiserror::Error;

/// Failure raised by a before or after validator.
///
/// Validators return this to abort the call; the pipeline reports it as
/// [`ApiError::Validator`](super::ApiError::Validator), never as a transport
/// or HTTP failure.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ValidatorError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ValidatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
