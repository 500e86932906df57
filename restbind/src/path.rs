//! Path templates with `{token}` placeholders.

use std::collections::HashMap;
use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::ConfigError;

/// Bytes left unencoded in substituted values: the RFC 3986 unreserved set.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(String),
}

/// A parsed path template such as `/users/{user_id}/posts/{post_id}`.
///
/// ## Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use restbind::path::PathTemplate;
///
/// let template = PathTemplate::parse("/files/{name}").unwrap();
/// assert_eq!(template.tokens(), vec!["name"]);
///
/// let values = HashMap::from([("name".to_string(), "a/b c".to_string())]);
/// assert_eq!(template.render(&values).unwrap(), "/files/a%2Fb%20c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parses a template, normalizing it to start with `/`.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidPathTemplate`] for an unclosed `{`,
    /// a stray `}`, a nested `{`, or an empty `{}`.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let raw = normalize(template);
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        match next {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(ConfigError::invalid_path(&raw, "nested '{'")),
                            other => name.push(other),
                        }
                    }
                    if !closed {
                        return Err(ConfigError::invalid_path(&raw, "unclosed '{'"));
                    }
                    if name.trim().is_empty() {
                        return Err(ConfigError::invalid_path(&raw, "empty parameter name"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Token(name));
                }
                '}' => return Err(ConfigError::invalid_path(&raw, "unmatched '}'")),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { raw, segments })
    }

    /// Joins a resource prefix and an endpoint template into one template.
    ///
    /// A trailing `/` on the joined path is dropped; an empty result is `/`.
    pub fn with_prefix(prefix: &str, path: &PathTemplate) -> Result<Self, ConfigError> {
        let prefix = prefix.trim_end_matches('/');
        let joined = format!("{prefix}{}", path.raw);
        let trimmed = joined.trim_end_matches('/');
        Self::parse(if trimmed.is_empty() { "/" } else { trimmed })
    }

    /// The normalized template text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Token names in order of first appearance.
    pub fn tokens(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Token(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Returns `true` if `name` is a token of this template.
    pub fn has_token(&self, name: &str) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Token(t) if t == name))
    }

    /// Substitutes every token, percent-encoding the substituted values only.
    ///
    /// ## Errors
    ///
    /// Returns the names of every token with no value, in template order.
    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, Vec<String>> {
        let missing: Vec<String> = self
            .tokens()
            .into_iter()
            .filter(|name| !values.contains_key(*name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Token(name) => {
                    if let Some(value) = values.get(name) {
                        path.extend(utf8_percent_encode(value, PATH_VALUE));
                    }
                }
            }
        }
        Ok(path)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ensures a path starts with `/`; an empty path becomes `/`.
pub fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
