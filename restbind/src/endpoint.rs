//! Endpoint descriptors with a type-state builder.
//!
//! An [`Endpoint`] is immutable metadata: id, method, path template, the
//! per-endpoint configuration overrides, and the optional query and request
//! schemas. Its response type is the [`ResponseFormat`] type parameter.
//! [`EndpointBuilder`] tracks the required fields in its type so `build`
//! only exists once id, method and path are set.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::Auth;
use crate::config::EndpointOverrides;
use crate::endpoint_id::EndpointId;
use crate::error::ConfigError;
use crate::method::RestMethod;
use crate::path::PathTemplate;
use crate::response::ResponseFormat;
use crate::schema::{schema, Schema};

/// Marker types for builder state tracking.
pub mod builder_state {
    /// A required field that has not been set.
    pub struct Missing;
    /// A required field that has been set.
    pub struct Present;
}

use builder_state::{Missing, Present};

/// A builder with every required field set.
pub type CompleteBuilder<F> = EndpointBuilder<Present, Present, Present, F>;

/// A declared REST endpoint.
///
/// ## Examples
///
/// ```rust
/// use restbind::{Endpoint, RestMethod};
/// use restbind::response::JsonFormat;
///
/// #[derive(serde::Deserialize)]
/// struct User { id: u64, name: String }
///
/// let endpoint: Endpoint<JsonFormat<User>> = Endpoint::builder()
///     .id("get_user")
///     .method(RestMethod::Get)
///     .path("/users/{id}")
///     .description("Retrieve a user by ID")
///     .build()
///     .unwrap();
///
/// assert_eq!(endpoint.path().tokens(), vec!["id"]);
/// ```
pub struct Endpoint<F: ResponseFormat> {
    id: EndpointId,
    method: RestMethod,
    path: PathTemplate,
    description: Option<String>,
    overrides: EndpointOverrides,
    query_schema: Option<Arc<dyn Schema>>,
    request_schema: Option<Arc<dyn Schema>>,
    _format: PhantomData<fn() -> F>,
}

impl<F: ResponseFormat> Clone for Endpoint<F> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            method: self.method,
            path: self.path.clone(),
            description: self.description.clone(),
            overrides: self.overrides.clone(),
            query_schema: self.query_schema.clone(),
            request_schema: self.request_schema.clone(),
            _format: PhantomData,
        }
    }
}

impl<F: ResponseFormat> fmt::Debug for Endpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path.as_str())
            .field("response", &std::any::type_name::<F>())
            .field("overrides", &self.overrides)
            .field("query_schema", &self.query_schema)
            .field("request_schema", &self.request_schema)
            .finish()
    }
}

impl<F: ResponseFormat> Endpoint<F> {
    pub fn builder() -> EndpointBuilder<Missing, Missing, Missing, F> {
        EndpointBuilder::new()
    }

    /// Starts a builder with id, method and path already set.
    pub fn with(
        id: impl Into<String>,
        method: RestMethod,
        path: impl Into<String>,
    ) -> CompleteBuilder<F> {
        Self::builder().id(id).method(method).path(path)
    }

    pub fn get(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Get, path)
    }

    pub fn post(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Post, path)
    }

    pub fn put(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Put, path)
    }

    pub fn patch(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Patch, path)
    }

    pub fn delete(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Delete, path)
    }

    pub fn head(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Head, path)
    }

    pub fn options(id: impl Into<String>, path: impl Into<String>) -> CompleteBuilder<F> {
        Self::with(id, RestMethod::Options, path)
    }

    pub fn id(&self) -> &EndpointId {
        &self.id
    }

    pub fn method(&self) -> RestMethod {
        self.method
    }

    pub fn path(&self) -> &PathTemplate {
        &self.path
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn overrides(&self) -> &EndpointOverrides {
        &self.overrides
    }

    pub fn query_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.query_schema.as_ref()
    }

    pub fn request_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.request_schema.as_ref()
    }
}

/// Type-state builder for [`Endpoint`].
///
/// `Id`, `Method` and `Path` are [`Missing`] or [`Present`]; optional
/// settings can be applied in any state.
pub struct EndpointBuilder<Id, Method, Path, F: ResponseFormat> {
    id: Option<String>,
    method: Option<RestMethod>,
    path: Option<String>,
    description: Option<String>,
    overrides: EndpointOverrides,
    query_schema: Option<Arc<dyn Schema>>,
    request_schema: Option<Arc<dyn Schema>>,
    _phantom: PhantomData<fn() -> (Id, Method, Path, F)>,
}

impl<F: ResponseFormat> EndpointBuilder<Missing, Missing, Missing, F> {
    pub fn new() -> Self {
        Self {
            id: None,
            method: None,
            path: None,
            description: None,
            overrides: EndpointOverrides::default(),
            query_schema: None,
            request_schema: None,
            _phantom: PhantomData,
        }
    }
}

impl<F: ResponseFormat> Default for EndpointBuilder<Missing, Missing, Missing, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, M, P, F: ResponseFormat> EndpointBuilder<I, M, P, F> {
    fn transition<I2, M2, P2>(self) -> EndpointBuilder<I2, M2, P2, F> {
        EndpointBuilder {
            id: self.id,
            method: self.method,
            path: self.path,
            description: self.description,
            overrides: self.overrides,
            query_schema: self.query_schema,
            request_schema: self.request_schema,
            _phantom: PhantomData,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.headers.insert(name.into(), value.into());
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.cookies.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.overrides.timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.overrides.follow_redirects = Some(follow);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.overrides.auth = Some(auth);
        self
    }

    /// Validates query arguments against `Q`.
    pub fn query<Q>(self) -> Self
    where
        Q: Serialize + DeserializeOwned + 'static,
    {
        self.query_schema(schema::<Q>())
    }

    pub fn query_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.query_schema = Some(schema);
        self
    }

    /// Validates the request body against `B`.
    pub fn request<B>(self) -> Self
    where
        B: Serialize + DeserializeOwned + 'static,
    {
        self.request_schema(schema::<B>())
    }

    pub fn request_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.request_schema = Some(schema);
        self
    }
}

impl<M, P, F: ResponseFormat> EndpointBuilder<Missing, M, P, F> {
    /// Sets the endpoint id, the key validators are registered under.
    pub fn id(self, id: impl Into<String>) -> EndpointBuilder<Present, M, P, F> {
        let mut next = self.transition();
        next.id = Some(id.into());
        next
    }
}

impl<I, P, F: ResponseFormat> EndpointBuilder<I, Missing, P, F> {
    pub fn method(self, method: RestMethod) -> EndpointBuilder<I, Present, P, F> {
        let mut next = self.transition();
        next.method = Some(method);
        next
    }
}

impl<I, M, F: ResponseFormat> EndpointBuilder<I, M, Missing, F> {
    /// Sets the path template, e.g. `/users/{id}`.
    pub fn path(self, path: impl Into<String>) -> EndpointBuilder<I, M, Present, F> {
        let mut next = self.transition();
        next.path = Some(path.into());
        next
    }
}

impl<F: ResponseFormat> EndpointBuilder<Present, Present, Present, F> {
    /// Builds the endpoint.
    ///
    /// ## Errors
    ///
    /// - [`ConfigError::InvalidEndpointId`] if the id is not a valid identifier.
    /// - [`ConfigError::InvalidPathTemplate`] if the path does not parse.
    /// - [`ConfigError::InvalidHeader`] if an override header cannot be sent.
    pub fn build(self) -> Result<Endpoint<F>, ConfigError> {
        let id = EndpointId::new(self.id.ok_or_else(|| ConfigError::missing_field("id"))?)?;
        let method = self.method.ok_or_else(|| ConfigError::missing_field("method"))?;
        let path = self.path.ok_or_else(|| ConfigError::missing_field("path"))?;
        let path = PathTemplate::parse(&path)?;
        crate::config::check_headers(&self.overrides.headers)?;

        Ok(Endpoint {
            id,
            method,
            path,
            description: self.description,
            overrides: self.overrides,
            query_schema: self.query_schema,
            request_schema: self.request_schema,
            _format: PhantomData,
        })
    }
}
