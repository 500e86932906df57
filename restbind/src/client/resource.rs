//! Resource declarations: endpoints grouped under a shared prefix.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::bound::Bound;
use super::declare::{Declarations, EndpointMap};
use super::{Client, Mode};
use crate::config::{check_headers, ResourceConfig};
use crate::endpoint::Endpoint;
use crate::endpoint_id::EndpointId;
use crate::error::{ApiError, ConfigError, ValidatorError};
use crate::path::PathTemplate;
use crate::request::CallArgs;
use crate::response::{DataResponse, ResponseFormat};
use crate::validator::Next;

pub(crate) struct ResourceInner {
    pub(crate) id: EndpointId,
    pub(crate) config: Arc<ResourceConfig>,
    pub(crate) endpoints: EndpointMap,
}

/// A declared resource: an id, its configuration and its endpoints.
///
/// Built once and attached to any number of clients. Cloning shares the
/// declaration.
///
/// ## Examples
///
/// ```rust,ignore
/// use restbind::{Endpoint, JsonFormat, ResourceConfig, ResourceDef};
///
/// let get_user: Endpoint<JsonFormat<User>> = Endpoint::get("get_user", "/{id}").build()?;
/// let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
///     .endpoint(&get_user)
///     .before(&get_user, |args| Ok(args))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct ResourceDef {
    pub(crate) inner: Arc<ResourceInner>,
}

impl ResourceDef {
    pub fn builder(id: impl Into<String>, config: ResourceConfig) -> ResourceDefBuilder {
        ResourceDefBuilder {
            id: id.into(),
            config,
            declarations: Declarations::default(),
        }
    }

    pub fn id(&self) -> &EndpointId {
        &self.inner.id
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.inner.config
    }

    /// Declared endpoint ids, sorted.
    pub fn endpoint_ids(&self) -> Vec<&EndpointId> {
        let mut ids: Vec<&EndpointId> = self.inner.endpoints.keys().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for ResourceDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDef")
            .field("id", &self.inner.id)
            .field("prefix", &self.inner.config.prefix)
            .field("endpoints", &self.endpoint_ids())
            .finish()
    }
}

/// Collects a resource's endpoints and validators.
pub struct ResourceDefBuilder {
    id: String,
    config: ResourceConfig,
    declarations: Declarations,
}

impl ResourceDefBuilder {
    pub fn endpoint<F: ResponseFormat>(mut self, endpoint: &Endpoint<F>) -> Self {
        self.declarations.declare(endpoint);
        self
    }

    /// Registers a before validator; validators run in registration order.
    pub fn before<F, V>(mut self, endpoint: &Endpoint<F>, validator: V) -> Self
    where
        F: ResponseFormat,
        V: Fn(CallArgs) -> Result<CallArgs, ValidatorError> + Send + Sync + 'static,
    {
        self.declarations.before(endpoint, validator);
        self
    }

    /// Registers an after validator; validators run in registration order.
    ///
    /// With after validators present, a non-2xx response is decoded and
    /// handed to them instead of raising. The body must still decode into
    /// the endpoint's response type: an error body that does not (such as a
    /// `{"detail": ...}` 404 for a `JsonFormat<Option<User>>` endpoint) is
    /// [`ApiError::Http`] and the validators never run. Declare the
    /// response type to accept the error shape, or use
    /// [`BinaryFormat`](crate::BinaryFormat), to map such responses.
    pub fn after<F, V>(mut self, endpoint: &Endpoint<F>, validator: V) -> Self
    where
        F: ResponseFormat,
        V: Fn(DataResponse<F::Output>) -> Result<DataResponse<F::Output>, ValidatorError>
            + Send
            + Sync
            + 'static,
    {
        self.declarations.after(endpoint, validator);
        self
    }

    /// Registers the endpoint's wrap validator. At most one per endpoint.
    pub fn wrap<F, V, Fut>(mut self, endpoint: &Endpoint<F>, validator: V) -> Self
    where
        F: ResponseFormat,
        V: Fn(Next<F::Output>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<DataResponse<F::Output>, ApiError>> + Send + 'static,
    {
        self.declarations.wrap(endpoint, validator);
        self
    }

    /// ## Errors
    ///
    /// - [`ConfigError::InvalidEndpointId`] for a malformed resource id.
    /// - [`ConfigError::InvalidPathTemplate`] for a malformed prefix.
    /// - [`ConfigError::InvalidHeader`] for an unsendable header.
    /// - Any error from matching validators to endpoints.
    pub fn build(self) -> Result<ResourceDef, ConfigError> {
        let id = EndpointId::new(self.id)?;
        PathTemplate::parse(&self.config.prefix)?;
        check_headers(&self.config.headers)?;
        let endpoints = self.declarations.finish(id.as_str())?;

        Ok(ResourceDef {
            inner: Arc::new(ResourceInner {
                id,
                config: Arc::new(self.config),
                endpoints,
            }),
        })
    }
}

/// A resource attached to a client.
pub struct Resource<M: Mode> {
    client: Client<M>,
    def: ResourceDef,
}

impl<M: Mode> Resource<M> {
    pub(crate) fn new(client: Client<M>, def: ResourceDef) -> Self {
        Self { client, def }
    }

    pub fn id(&self) -> &EndpointId {
        self.def.id()
    }

    pub fn config(&self) -> &ResourceConfig {
        self.def.config()
    }

    /// Binds one of this resource's endpoints.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::UnknownEndpoint`] if the resource does not declare it,
    /// [`ConfigError::EndpointTypeMismatch`] if it was declared with another
    /// response type.
    pub fn bind<F: ResponseFormat>(&self, endpoint: &Endpoint<F>) -> Result<Bound<F, M>, ConfigError> {
        self.client.bind_in(Some(&self.def), endpoint)
    }
}

impl<M: Mode> Clone for Resource<M> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            def: self.def.clone(),
        }
    }
}

impl<M: Mode> fmt::Debug for Resource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("def", &self.def).finish()
    }
}
