use std::fmt;

use thiserror::Error;

/// Identifier of a declared endpoint or resource.
///
/// The id is the exact key validators are registered under and bound
/// methods are cached by. Comparison is case-sensitive.
///
/// Rules:
/// 1. Must start with an alphabetic character.
/// 2. Remaining characters must be alphanumeric or `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointIdError {
    #[error("identifier cannot be empty")]
    Empty,
    #[error("identifier must start with an alphabetic character")]
    InvalidStartCharacter,
    #[error("identifier contains invalid character: '{0}'")]
    InvalidCharacter(char),
}

impl EndpointId {
    pub fn new<S: Into<String>>(id: S) -> Result<Self, EndpointIdError> {
        let s = id.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), EndpointIdError> {
        let mut chars = s.chars();

        match chars.next() {
            None => return Err(EndpointIdError::Empty),
            Some(c) if !c.is_alphabetic() => return Err(EndpointIdError::InvalidStartCharacter),
            _ => {}
        }

        if let Some(bad) = chars.find(|c| !c.is_alphanumeric() && *c != '_') {
            return Err(EndpointIdError::InvalidCharacter(bad));
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EndpointId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<EndpointId> for String {
    fn from(id: EndpointId) -> Self {
        id.0
    }
}

impl TryFrom<String> for EndpointId {
    type Error = EndpointIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for EndpointId {
    type Error = EndpointIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
