//! Content-negotiated response values.

/// A body decoded by [`NegotiatedFormat`](super::NegotiatedFormat).
///
/// The variant records which decoder the response's `Content-Type` selected.
/// `T` receives JSON and YAML documents, `X` receives XML.
///
/// ## Examples
///
/// ```rust
/// use restbind::response::ApiResponseValue;
///
/// let value: ApiResponseValue<u32> = ApiResponseValue::Json(7);
/// assert_eq!(value.structured(), Some(&7));
/// assert_eq!(value.media_kind(), "json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponseValue<T, X = ()> {
    Json(T),
    Yaml(T),
    Xml(X),
    PlainText(String),
    Html(String),
    Csv(String),
    Binary(Vec<u8>),
}

impl<T, X> ApiResponseValue<T, X> {
    /// Short name of the decoder that produced this value.
    pub fn media_kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
            Self::Xml(_) => "xml",
            Self::PlainText(_) => "text",
            Self::Html(_) => "html",
            Self::Csv(_) => "csv",
            Self::Binary(_) => "binary",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::PlainText(_) | Self::Html(_) | Self::Csv(_))
    }

    /// The `T` payload, whether it arrived as JSON or YAML.
    pub fn structured(&self) -> Option<&T> {
        match self {
            Self::Json(v) | Self::Yaml(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&T> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_yaml(&self) -> Option<&T> {
        match self {
            Self::Yaml(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&X> {
        match self {
            Self::Xml(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::PlainText(s) | Self::Html(s) | Self::Csv(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Takes the JSON payload, handing the value back for any other variant.
    pub fn into_json(self) -> Result<T, Self> {
        match self {
            Self::Json(v) => Ok(v),
            other => Err(other),
        }
    }

    /// Takes the `T` payload from either JSON or YAML.
    pub fn into_structured(self) -> Result<T, Self> {
        match self {
            Self::Json(v) | Self::Yaml(v) => Ok(v),
            other => Err(other),
        }
    }
}
