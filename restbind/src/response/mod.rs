//! Response handling.
//!
//! Transports produce a [`RawResponse`]; the endpoint's [`ResponseFormat`]
//! decodes it and the result is wrapped in a [`DataResponse`] that keeps the
//! status, headers, final URL and elapsed time alongside the data.

mod data;
mod format;
mod value;

pub(crate) use data::decode;
pub use data::{DataResponse, RawResponse};
pub use format::{
    BinaryFormat, CsvFormat, HtmlFormat, JsonFormat, NegotiatedFormat, PlainTextFormat,
    ResponseFormat, XmlFormat, YamlFormat,
};
pub use value::ApiResponseValue;
