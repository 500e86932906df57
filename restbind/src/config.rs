//! Client and resource configuration layers.
//!
//! [`ClientConfig`] is the outermost layer and the only source of the base
//! URL. [`ResourceConfig`] adds a path prefix and optional overrides, and
//! [`EndpointOverrides`] holds whatever a single endpoint overrides. The three
//! are merged per call by [`resolve`](crate::resolve::resolve).

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::auth::Auth;
use crate::error::ConfigError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// What happens to call arguments a query schema does not retain.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueryPolicy {
    /// Reject them as a request validation error.
    #[default]
    Strict,
    /// Send them verbatim next to the validated parameters.
    Loose,
}

/// Client-level configuration.
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use restbind::{Auth, ClientConfig};
///
/// let config = ClientConfig::new("https://api.example.com")
///     .unwrap()
///     .with_timeout(Duration::from_secs(10))
///     .with_header("User-Agent", "restbind")
///     .with_auth(Auth::bearer("sk-xxx"));
///
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// assert!(!config.follow_redirects);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub follow_redirects: bool,
    pub auth: Option<Auth>,
    /// Raise [`ApiError::Http`](crate::ApiError::Http) for non-2xx statuses.
    pub raise_on_error: bool,
    pub query_policy: QueryPolicy,
}

impl ClientConfig {
    /// Creates a configuration with defaults for everything but the base URL.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self::with_base_url(Url::parse(base_url)?))
    }

    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            follow_redirects: false,
            auth: None,
            raise_on_error: true,
            query_policy: QueryPolicy::default(),
        }
    }

    /// Normalizes a raw configuration mapping.
    ///
    /// `timeout` is read as seconds and may be fractional.
    ///
    /// ## Errors
    ///
    /// - [`ConfigError::MissingField`] if `base_url` is absent.
    /// - [`ConfigError::InvalidUrl`] if `base_url` does not parse.
    /// - [`ConfigError::InvalidConfig`] for any other malformed field.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use restbind::ClientConfig;
    ///
    /// let config = ClientConfig::from_value(serde_json::json!({
    ///     "base_url": "https://api.example.com",
    ///     "timeout": 2.5,
    ///     "headers": {"Accept": "application/json"}
    /// }))
    /// .unwrap();
    /// assert_eq!(config.timeout.as_millis(), 2500);
    /// ```
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawClientConfig =
            serde_json::from_value(value).map_err(ConfigError::InvalidConfig)?;
        let base_url = raw
            .base_url
            .ok_or_else(|| ConfigError::missing_field("base_url"))?;

        let mut config = Self::new(&base_url)?;
        if let Some(timeout) = raw.timeout {
            config.timeout = timeout;
        }
        config.headers = raw.headers;
        config.cookies = raw.cookies;
        config.auth = raw.auth;
        if let Some(follow) = raw.follow_redirects {
            config.follow_redirects = follow;
        }
        if let Some(raise) = raw.raise_on_error {
            config.raise_on_error = raise;
        }
        if let Some(policy) = raw.query_policy {
            config.query_policy = policy;
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    pub fn with_query_policy(mut self, policy: QueryPolicy) -> Self {
        self.query_policy = policy;
        self
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClientConfig {
    base_url: Option<String>,
    #[serde(default, deserialize_with = "seconds")]
    timeout: Option<Duration>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    cookies: BTreeMap<String, String>,
    follow_redirects: Option<bool>,
    auth: Option<Auth>,
    raise_on_error: Option<bool>,
    query_policy: Option<QueryPolicy>,
}

/// Resource-level configuration: a path prefix plus optional overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    #[serde(default)]
    pub prefix: String,
    #[serde(default, deserialize_with = "seconds")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub follow_redirects: Option<bool>,
    #[serde(default)]
    pub auth: Option<Auth>,
    #[serde(default)]
    pub raise_on_error: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ResourceConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Normalizes a raw configuration mapping, `timeout` in seconds.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] for malformed or unknown fields.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(ConfigError::InvalidConfig)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = Some(raise);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Values a single endpoint overrides. Absent fields defer to outer layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointOverrides {
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
    pub follow_redirects: Option<bool>,
    pub auth: Option<Auth>,
}

/// Deserializes an optional timeout given in (possibly fractional) seconds.
fn seconds<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer)?
        .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
        .transpose()
}

/// Checks that every header can be sent over HTTP.
pub(crate) fn check_headers(headers: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::invalid_header(name, e))?;
        HeaderValue::from_str(value).map_err(|e| ConfigError::invalid_header(name, e))?;
    }
    Ok(())
}
