//! Declarative REST clients.
//!
//! An API is declared as a graph of typed endpoint descriptors grouped into
//! resources and attached to a client. Binding an endpoint yields a callable
//! that merges configuration, builds the request, runs validators, sends it
//! through a transport and decodes the response into the endpoint's declared
//! type.
//!
//! - [`Endpoint`] - immutable descriptor: method, path template, overrides
//! - [`ResourceDef`] - endpoints sharing a path prefix and configuration
//! - [`Client`] - base configuration, transport and bound-endpoint cache
//! - [`Bound`] - a callable endpoint returning [`DataResponse`]
//!
//! One declaration serves both execution disciplines: [`BlockingClient`]
//! calls block the calling thread and [`AsyncClient`] calls are `async`.
//!
//! ## Examples
//!
//! ```rust,ignore
//! use restbind::{BlockingClient, CallArgs, ClientConfig, Endpoint, JsonFormat, ResourceConfig, ResourceDef};
//!
//! #[derive(serde::Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let get_user: Endpoint<JsonFormat<User>> = Endpoint::get("get_user", "/{id}").build()?;
//! let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
//!     .endpoint(&get_user)
//!     .build()?;
//!
//! let client = BlockingClient::builder(ClientConfig::new("https://api.example.com")?)
//!     .resource(&users)
//!     .build()?;
//!
//! let user = client
//!     .resource(&users)?
//!     .bind(&get_user)?
//!     .call(CallArgs::new().arg("id", 1))?;
//! assert_eq!(user.status_code, 200);
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod endpoint_id;
pub mod error;
pub mod method;
pub mod path;
pub mod request;
pub mod resolve;
pub mod response;
pub mod schema;
pub mod transport;
pub mod validator;

pub use auth::Auth;
pub use client::{
    AsyncClient, Blocking, BlockingClient, Bound, Client, ClientBuilder, Mode, Resource, ResourceDef,
    ResourceDefBuilder, Suspending,
};
pub use config::{ClientConfig, EndpointOverrides, QueryPolicy, ResourceConfig};
pub use endpoint::Endpoint;
pub use endpoint_id::EndpointId;
pub use error::{
    ApiError, ClientError, ConfigError, FieldError, HttpError, ValidationError, ValidatorError,
};
pub use method::RestMethod;
pub use path::PathTemplate;
pub use request::{Body, CallArgs, FormPart, RequestSpec};
pub use resolve::EffectiveConfig;
pub use response::{
    ApiResponseValue, BinaryFormat, CsvFormat, DataResponse, HtmlFormat, JsonFormat,
    NegotiatedFormat, PlainTextFormat, RawResponse, ResponseFormat, XmlFormat, YamlFormat,
};
pub use schema::{schema, Schema, SerdeSchema};
pub use transport::{AsyncTransport, BlockingTransport, TransportError};
pub use validator::{Next, ValidatorMode};
