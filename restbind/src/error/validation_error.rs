//! Body decoding and schema validation errors.

use std::fmt;

use thiserror::Error;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field, when the validation engine names one.
    pub field: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl FieldError {
    pub fn new(field: Option<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Builds a field error from a serde error message.
    ///
    /// serde names the field for `missing field`, `unknown field` and
    /// `duplicate field` errors as the first back-quoted word.
    pub fn from_serde_message(message: &str) -> Self {
        let names_field = ["missing field", "unknown field", "duplicate field"]
            .iter()
            .any(|prefix| message.starts_with(prefix));

        let field = names_field
            .then(|| message.split('`').nth(1))
            .flatten()
            .map(str::to_string);

        Self::new(field, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Joins field errors for display.
pub(crate) fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors while turning raw bytes or values into declared types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing failed.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    /// Response content doesn't match the expected format.
    #[error("Unexpected content type: expected {expected}, got {actual}")]
    ContentTypeMismatch {
        /// The expected content type.
        expected: String,
        /// The actual content type received.
        actual: String,
    },

    /// A value did not satisfy a declared schema.
    #[error("{schema} validation failed: {}", summarize(.errors))]
    Schema {
        /// Name of the schema that rejected the value.
        schema: String,
        /// Field-level detail.
        errors: Vec<FieldError>,
    },
}

impl ValidationError {
    /// Returns `true` if this is a format mismatch error.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Self::ContentTypeMismatch { .. })
    }

    /// Returns `true` if this is a parsing error.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::JsonParse(_) | Self::YamlParse(_) | Self::XmlParse(_)
        )
    }

    /// Field-level detail, when the failure carries any.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Schema { errors, .. } => errors.clone(),
            Self::JsonParse(e) => vec![FieldError::from_serde_message(&e.to_string())],
            Self::YamlParse(e) => vec![FieldError::from_serde_message(&e.to_string())],
            Self::XmlParse(e) => vec![FieldError::from_serde_message(&e.to_string())],
            Self::ContentTypeMismatch { .. } => vec![FieldError::new(None, self.to_string())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_from_missing_field_message() {
        let err = FieldError::from_serde_message("missing field `email`");
        assert_eq!(err.field.as_deref(), Some("email"));
        assert_eq!(err.to_string(), "email: missing field `email`");
    }

    #[test]
    fn test_field_from_invalid_type_message() {
        let err = FieldError::from_serde_message("invalid type: string \"x\", expected u64");
        assert_eq!(err.field, None);
    }

    #[test]
    fn test_content_type_mismatch() {
        let err = ValidationError::ContentTypeMismatch {
            expected: "application/json".to_string(),
            actual: "text/html".to_string(),
        };
        assert!(err.is_format_mismatch());
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_json_parse_is_parse_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err = ValidationError::JsonParse(json_err);
        assert!(err.is_parse_error());
        assert_eq!(err.field_errors().len(), 1);
    }

    #[test]
    fn test_schema_display() {
        let err = ValidationError::Schema {
            schema: "CreateUser".to_string(),
            errors: vec![
                FieldError::new(Some("email".to_string()), "missing field `email`"),
                FieldError::new(None, "bad"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "CreateUser validation failed: email: missing field `email`; bad"
        );
    }
}
