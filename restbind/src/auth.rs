//! Authentication applied to outgoing requests.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// How credentials are attached to a request.
///
/// Auth can be set on the client, a resource or an endpoint; the most
/// specific layer wins. `Debug` output never contains the secret.
///
/// ## Examples
///
/// ```rust
/// use restbind::Auth;
///
/// let auth = Auth::bearer("sk-xxx");
/// assert_eq!(format!("{auth:?}"), "Bearer(***)");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Auth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// `Authorization: Basic base64(username:password)`.
    Basic {
        /// The user name.
        username: String,
        /// The password.
        password: String,
    },
    /// The key sent in a custom header, e.g. `X-API-Key`.
    ApiKey {
        /// Header name.
        header: String,
        /// The key.
        key: String,
    },
    /// The key sent as a query parameter, e.g. `?key=...`.
    QueryParam {
        /// Query parameter name.
        name: String,
        /// The key.
        key: String,
    },
}

/// Where a credential ends up on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Header(String, String),
    Query(String, String),
}

impl Auth {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn api_key(header: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ApiKey {
            header: header.into(),
            key: key.into(),
        }
    }

    pub fn query_param(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::QueryParam {
            name: name.into(),
            key: key.into(),
        }
    }

    /// The header or query pair this auth adds to a request.
    pub fn credential(&self) -> Credential {
        match self {
            Self::Bearer(token) => {
                Credential::Header("Authorization".to_string(), format!("Bearer {token}"))
            }
            Self::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                Credential::Header("Authorization".to_string(), format!("Basic {encoded}"))
            }
            Self::ApiKey { header, key } => Credential::Header(header.clone(), key.clone()),
            Self::QueryParam { name, key } => Credential::Query(name.clone(), key.clone()),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::Basic { username, .. } => write!(f, "Basic({username}:***)"),
            Self::ApiKey { header, .. } => write!(f, "ApiKey({header}: ***)"),
            Self::QueryParam { name, .. } => write!(f, "QueryParam({name}=***)"),
        }
    }
}
