//! The verb an endpoint is declared with.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Request method of a declared endpoint.
///
/// Endpoint shorthands such as [`Endpoint::get`](crate::Endpoint::get) pick
/// the method. Parsing from text ignores ASCII case.
///
/// ## Examples
///
/// ```rust
/// use restbind::RestMethod;
///
/// let parsed: RestMethod = "patch".parse().unwrap();
/// assert_eq!(parsed, RestMethod::Patch);
/// assert_eq!(parsed.as_str(), "PATCH");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl RestMethod {
    /// Upper-case wire name, as recorded on the `api_request` span.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}
