use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use url::Url;

use super::format::ResponseFormat;
use crate::error::{ApiError, HttpError};

/// What a transport hands back: status, headers and the undecoded body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// The final URL, after any redirects.
    pub url: Url,
    pub elapsed: Duration,
    pub body: Bytes,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A decoded body together with the HTTP metadata it arrived with.
///
/// ## Examples
///
/// ```rust,ignore
/// let response = get_user.call(CallArgs::new().arg("id", 1))?;
/// if response.is_success() {
///     println!("{} in {:?}", response.data.name, response.elapsed);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DataResponse<T> {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub url: Url,
    pub elapsed: Duration,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// Returns `true` for any 4xx or 5xx status.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }

    /// The status code's canonical reason phrase, e.g. `Not Found`.
    pub fn reason(&self) -> Option<&'static str> {
        StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
    }

    /// Transforms the data, keeping the metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DataResponse<U> {
        DataResponse {
            status_code: self.status_code,
            headers: self.headers,
            url: self.url,
            elapsed: self.elapsed,
            data: f(self.data),
        }
    }

    /// Replaces the data, keeping the metadata.
    pub fn with_data<U>(self, data: U) -> DataResponse<U> {
        self.map(|_| data)
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

/// Applies the status policy and decodes the body into `F::Output`.
///
/// - 2xx: decode; a body that does not fit is `ApiError::ResponseValidation`.
/// - non-2xx with `raise`: `ApiError::Http`, nothing decoded.
/// - non-2xx otherwise: decode and hand on; an undecodable body is
///   `ApiError::Http`.
pub(crate) fn decode<F: ResponseFormat>(
    raw: RawResponse,
    raise: bool,
) -> Result<DataResponse<F::Output>, ApiError> {
    let success = raw.is_success();
    if !success && raise {
        return Err(HttpError::new(raw.status, raw.url, raw.body).into());
    }

    let parsed = F::parse(raw.content_type(), raw.body.clone());
    let RawResponse {
        status,
        headers,
        url,
        elapsed,
        body,
    } = raw;

    match parsed {
        Ok(data) => Ok(DataResponse {
            status_code: status,
            headers,
            url,
            elapsed,
            data,
        }),
        Err(source) if success => Err(ApiError::ResponseValidation {
            status,
            body,
            source,
        }),
        Err(_) => Err(HttpError::new(status, url, body).into()),
    }
}
