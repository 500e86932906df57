//! Response format trait and implementations.
//!
//! A [`ResponseFormat`] is the declared response type of an endpoint: it
//! names the Rust output type and knows how to decode a body into it.

use std::marker::PhantomData;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::value::ApiResponseValue;
use crate::error::ValidationError;

/// Decoding strategy for an endpoint's response body.
///
/// Decoding is eager and all-or-nothing: either the whole body becomes an
/// `Output` or an error is returned.
///
/// ## Examples
///
/// ```rust
/// use restbind::response::{JsonFormat, ResponseFormat};
///
/// #[derive(serde::Deserialize)]
/// struct User { id: u64, name: String }
///
/// let user = JsonFormat::<User>::parse(None, r#"{"id": 1, "name": "Ann"}"#.into()).unwrap();
/// assert_eq!(user.name, "Ann");
/// ```
pub trait ResponseFormat: Send + Sync + 'static {
    /// The decoded type handed to callers.
    type Output: Send + 'static;

    /// Decodes a body. `content_type` is the response's `Content-Type`
    /// header, if any.
    fn parse(content_type: Option<&str>, body: Bytes) -> Result<Self::Output, ValidationError>;

    /// The media type this format expects.
    fn content_type() -> &'static str;
}

/// JSON response format with typed deserialization.
///
/// An empty body decodes as JSON `null`, so `()` and `Option<T>` accept
/// bodiless responses such as `204 No Content`.
#[derive(Debug, Clone, Copy)]
pub struct JsonFormat<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned + Send + 'static> ResponseFormat for JsonFormat<T> {
    type Output = T;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<T, ValidationError> {
        let text: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &body
        };
        serde_json::from_slice(text).map_err(ValidationError::JsonParse)
    }

    fn content_type() -> &'static str {
        "application/json"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct YamlFormat<T>(PhantomData<fn() -> T>);

impl<T: DeserializeOwned + Send + 'static> ResponseFormat for YamlFormat<T> {
    type Output = T;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<T, ValidationError> {
        serde_yaml::from_slice(&body).map_err(ValidationError::YamlParse)
    }

    fn content_type() -> &'static str {
        "application/yaml"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct XmlFormat<X>(PhantomData<fn() -> X>);

impl<X: DeserializeOwned + Send + 'static> ResponseFormat for XmlFormat<X> {
    type Output = X;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<X, ValidationError> {
        quick_xml::de::from_reader(body.as_ref()).map_err(ValidationError::XmlParse)
    }

    fn content_type() -> &'static str {
        "application/xml"
    }
}

fn utf8(body: Bytes, expected: &str) -> Result<String, ValidationError> {
    String::from_utf8(body.to_vec()).map_err(|e| ValidationError::ContentTypeMismatch {
        expected: expected.to_string(),
        actual: format!("invalid UTF-8: {e}"),
    })
}

/// The body as a UTF-8 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextFormat;

impl ResponseFormat for PlainTextFormat {
    type Output = String;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<String, ValidationError> {
        utf8(body, "valid UTF-8 text")
    }

    fn content_type() -> &'static str {
        "text/plain"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFormat;

impl ResponseFormat for HtmlFormat {
    type Output = String;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<String, ValidationError> {
        utf8(body, "valid UTF-8 HTML")
    }

    fn content_type() -> &'static str {
        "text/html"
    }
}

/// CSV as text; splitting into rows is left to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormat;

impl ResponseFormat for CsvFormat {
    type Output = String;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<String, ValidationError> {
        utf8(body, "valid UTF-8 CSV")
    }

    fn content_type() -> &'static str {
        "text/csv"
    }
}

/// Raw bytes, uninterpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryFormat;

impl ResponseFormat for BinaryFormat {
    type Output = Vec<u8>;

    fn parse(_content_type: Option<&str>, body: Bytes) -> Result<Vec<u8>, ValidationError> {
        Ok(body.to_vec())
    }

    fn content_type() -> &'static str {
        "application/octet-stream"
    }
}

/// Picks the decoder from the response's `Content-Type`.
///
/// JSON and YAML decode into `T`, XML into `X`, text types into strings and
/// anything else into bytes. A response without a `Content-Type` is
/// treated as JSON.
#[derive(Debug, Clone, Copy)]
pub struct NegotiatedFormat<T, X = ()>(PhantomData<fn() -> (T, X)>);

impl<T, X> ResponseFormat for NegotiatedFormat<T, X>
where
    T: DeserializeOwned + Send + 'static,
    X: DeserializeOwned + Send + 'static,
{
    type Output = ApiResponseValue<T, X>;

    fn parse(content_type: Option<&str>, body: Bytes) -> Result<Self::Output, ValidationError> {
        let media = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase());

        let Some(media) = media else {
            return JsonFormat::<T>::parse(None, body).map(ApiResponseValue::Json);
        };

        if media.ends_with("json") {
            JsonFormat::<T>::parse(None, body).map(ApiResponseValue::Json)
        } else if media.ends_with("yaml") || media.ends_with("yml") {
            YamlFormat::<T>::parse(None, body).map(ApiResponseValue::Yaml)
        } else if media.ends_with("xml") {
            XmlFormat::<X>::parse(None, body).map(ApiResponseValue::Xml)
        } else if media == "text/html" {
            HtmlFormat::parse(None, body).map(ApiResponseValue::Html)
        } else if media == "text/csv" {
            CsvFormat::parse(None, body).map(ApiResponseValue::Csv)
        } else if media.starts_with("text/") {
            PlainTextFormat::parse(None, body).map(ApiResponseValue::PlainText)
        } else {
            BinaryFormat::parse(None, body).map(ApiResponseValue::Binary)
        }
    }

    fn content_type() -> &'static str {
        "*/*"
    }
}
