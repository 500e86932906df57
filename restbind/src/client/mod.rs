//! Clients, resource attachment and endpoint binding.
//!
//! A [`Client`] owns the client-level configuration, the resources attached
//! to it, its own endpoints and one transport. Its mode type parameter picks
//! the execution discipline: [`Blocking`] calls block the calling thread,
//! [`Suspending`] calls are `async`. Everything else is shared.
//!
//! ## Examples
//!
//! ```rust,ignore
//! use restbind::{AsyncClient, CallArgs, ClientConfig, Endpoint, JsonFormat, ResourceConfig, ResourceDef};
//!
//! let get_user: Endpoint<JsonFormat<User>> = Endpoint::get("get_user", "/{id}").build()?;
//! let users = ResourceDef::builder("users", ResourceConfig::new("/users"))
//!     .endpoint(&get_user)
//!     .build()?;
//!
//! let client = AsyncClient::builder(ClientConfig::new("https://api.example.com")?)
//!     .resource(&users)
//!     .build()?;
//!
//! let response = client.resource(&users)?.bind(&get_user)?.call(CallArgs::new().arg("id", 1)).await?;
//! println!("{}", response.data.name);
//! ```

mod bound;
mod declare;
mod resource;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::config::{check_headers, ClientConfig};
use crate::endpoint::Endpoint;
use crate::endpoint_id::EndpointId;
use crate::error::{ApiError, ClientError, ConfigError, ValidatorError};
use crate::path::PathTemplate;
use crate::request::CallArgs;
use crate::response::{DataResponse, ResponseFormat};
use crate::transport::{AsyncTransport, BlockingTransport, ReqwestBlockingTransport, ReqwestTransport};
use crate::validator::Next;

pub use bound::Bound;
pub use resource::{Resource, ResourceDef, ResourceDefBuilder};

use bound::Pipeline;
use declare::{lookup, Declarations, EndpointMap};

const CLIENT_OWNER: &str = "client";

mod sealed {
    pub trait Sealed {}
}

/// Execution discipline of a [`Client`].
pub trait Mode: sealed::Sealed + Send + Sync + Sized + 'static {
    /// The transport this mode sends through.
    type Transport: ?Sized + Send + Sync + 'static;

    /// Creates the stock reqwest transport for this mode.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    fn default_transport() -> Result<Arc<Self::Transport>, ClientError>;
}

/// Calls block the calling thread.
#[derive(Debug, Clone, Copy)]
pub struct Blocking;

/// Calls are `async` and suspend only at the transport send.
#[derive(Debug, Clone, Copy)]
pub struct Suspending;

impl sealed::Sealed for Blocking {}
impl sealed::Sealed for Suspending {}

impl Mode for Blocking {
    type Transport = dyn BlockingTransport;

    fn default_transport() -> Result<Arc<Self::Transport>, ClientError> {
        Ok(Arc::new(ReqwestBlockingTransport::new()?))
    }
}

impl Mode for Suspending {
    type Transport = dyn AsyncTransport;

    fn default_transport() -> Result<Arc<Self::Transport>, ClientError> {
        Ok(Arc::new(ReqwestTransport::new()?))
    }
}

pub type BlockingClient = Client<Blocking>;
pub type AsyncClient = Client<Suspending>;

type BindingKey = (Option<EndpointId>, EndpointId);
type BindingSlot = OnceLock<Arc<dyn Any + Send + Sync>>;

struct ClientInner<M: Mode> {
    config: Arc<ClientConfig>,
    endpoints: EndpointMap,
    resources: HashMap<EndpointId, ResourceDef>,
    transport: Arc<M::Transport>,
    bindings: HashMap<BindingKey, BindingSlot>,
}

/// A configured API client.
///
/// Cloning is cheap; clones share configuration, transport and the cache of
/// bound endpoints.
pub struct Client<M: Mode> {
    inner: Arc<ClientInner<M>>,
}

impl<M: Mode> Client<M> {
    pub fn builder(config: ClientConfig) -> ClientBuilder<M> {
        ClientBuilder {
            config,
            resources: Vec::new(),
            declarations: Declarations::default(),
            transport: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The attached resource with the same id as `def`.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::UnknownResource`] if no such resource is attached.
    pub fn resource(&self, def: &ResourceDef) -> Result<Resource<M>, ConfigError> {
        let attached = self
            .inner
            .resources
            .get(def.id())
            .ok_or_else(|| ConfigError::UnknownResource {
                id: def.id().to_string(),
            })?;
        Ok(Resource::new(self.clone(), attached.clone()))
    }

    /// Binds a client-level endpoint.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::UnknownEndpoint`] if the client does not declare it,
    /// [`ConfigError::EndpointTypeMismatch`] if it was declared with another
    /// response type.
    pub fn bind<F: ResponseFormat>(&self, endpoint: &Endpoint<F>) -> Result<Bound<F, M>, ConfigError> {
        self.bind_in(None, endpoint)
    }

    /// Returns the cached binding, creating and publishing it on first use.
    ///
    /// Racing first binds each build a binding; the first one published wins
    /// and every caller receives it.
    pub(crate) fn bind_in<F: ResponseFormat>(
        &self,
        resource: Option<&ResourceDef>,
        endpoint: &Endpoint<F>,
    ) -> Result<Bound<F, M>, ConfigError> {
        let owner = resource.map_or(CLIENT_OWNER, |def| def.id().as_str());
        let key = (resource.map(|def| def.id().clone()), endpoint.id().clone());
        let slot = self
            .inner
            .bindings
            .get(&key)
            .ok_or_else(|| ConfigError::UnknownEndpoint {
                owner: owner.to_string(),
                id: endpoint.id().to_string(),
            })?;

        let published = match slot.get() {
            Some(cached) => cached,
            None => {
                let fresh: Arc<dyn Any + Send + Sync> = Arc::new(self.make_binding::<F>(resource, endpoint.id())?);
                slot.get_or_init(|| fresh)
            }
        };

        published
            .downcast_ref::<Bound<F, M>>()
            .cloned()
            .ok_or_else(|| ConfigError::EndpointTypeMismatch {
                id: endpoint.id().to_string(),
            })
    }

    fn make_binding<F: ResponseFormat>(
        &self,
        resource: Option<&ResourceDef>,
        id: &EndpointId,
    ) -> Result<Bound<F, M>, ConfigError> {
        let (owner, endpoints, prefix, resource_config) = match resource {
            Some(def) => {
                let attached = self
                    .inner
                    .resources
                    .get(def.id())
                    .ok_or_else(|| ConfigError::UnknownResource {
                        id: def.id().to_string(),
                    })?;
                (
                    attached.id().as_str(),
                    &attached.inner.endpoints,
                    attached.config().prefix.as_str(),
                    Some(Arc::clone(&attached.inner.config)),
                )
            }
            None => (CLIENT_OWNER, &self.inner.endpoints, "", None),
        };

        let declared = lookup::<F>(endpoints, owner, id)?;
        let path = PathTemplate::with_prefix(prefix, declared.endpoint.path())?;
        debug!(owner, endpoint = %id, path = %path, "bound endpoint");

        let pipeline = Pipeline {
            owner: owner.to_string(),
            endpoint: declared.endpoint.clone(),
            path,
            client: Arc::clone(&self.inner.config),
            resource: resource_config,
            chain: declared.chain.clone(),
        };
        Ok(Bound::new(pipeline, Arc::clone(&self.inner.transport)))
    }
}

impl<M: Mode> Clone for Client<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Mode> fmt::Debug for Client<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resources: Vec<&EndpointId> = self.inner.resources.keys().collect();
        resources.sort();
        let mut endpoints: Vec<&EndpointId> = self.inner.endpoints.keys().collect();
        endpoints.sort();
        f.debug_struct("Client")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("resources", &resources)
            .field("endpoints", &endpoints)
            .finish()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<M: Mode> {
    config: ClientConfig,
    resources: Vec<ResourceDef>,
    declarations: Declarations,
    transport: Option<Arc<M::Transport>>,
}

impl<M: Mode> ClientBuilder<M> {
    /// Attaches a resource.
    pub fn resource(mut self, def: &ResourceDef) -> Self {
        self.resources.push(def.clone());
        self
    }

    /// Declares a client-level endpoint, bound without a resource prefix.
    pub fn endpoint<F: ResponseFormat>(mut self, endpoint: &Endpoint<F>) -> Self {
        self.declarations.declare(endpoint);
        self
    }

    pub fn before<F, V>(mut self, endpoint: &Endpoint<F>, validator: V) -> Self
    where
        F: ResponseFormat,
        V: Fn(CallArgs) -> Result<CallArgs, ValidatorError> + Send + Sync + 'static,
    {
        self.declarations.before(endpoint, validator);
        self
    }

    /// Registers an after validator for a client-level endpoint.
    ///
    /// An error body that does not decode into the response type is
    /// [`ApiError::Http`] and skips the validators; see
    /// [`ResourceDefBuilder::after`].
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

    pub fn wrap<F, V, Fut>(mut self, endpoint: &Endpoint<F>, validator: V) -> Self
    where
        F: ResponseFormat,
        V: Fn(Next<F::Output>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<DataResponse<F::Output>, ApiError>> + Send + 'static,
    {
        self.declarations.wrap(endpoint, validator);
        self
    }

    /// Sends through `transport` instead of the stock reqwest one.
    pub fn transport(mut self, transport: Arc<M::Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the [`Client`].
    ///
    /// ## Errors
    ///
    /// - [`ApiError::Config`] for invalid headers, duplicate resources,
    ///   duplicate endpoints or validators that do not match an endpoint.
    /// - [`ApiError::Client`] if the stock transport cannot be constructed.
    pub fn build(self) -> Result<Client<M>, ApiError> {
        check_headers(&self.config.headers)?;
        let endpoints = self.declarations.finish(CLIENT_OWNER)?;

        let mut bindings: HashMap<BindingKey, BindingSlot> = endpoints
            .keys()
            .map(|id| ((None, id.clone()), OnceLock::new()))
            .collect();

        let mut resources = HashMap::new();
        for def in self.resources {
            if resources.contains_key(def.id()) {
                return Err(ConfigError::DuplicateResource {
                    id: def.id().to_string(),
                }
                .into());
            }
            for id in def.inner.endpoints.keys() {
                bindings.insert((Some(def.id().clone()), id.clone()), OnceLock::new());
            }
            resources.insert(def.id().clone(), def);
        }

        let transport = match self.transport {
            Some(transport) => transport,
            None => M::default_transport()?,
        };

        debug!(
            base_url = %self.config.base_url,
            resources = resources.len(),
            endpoints = endpoints.len(),
            "built client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                config: Arc::new(self.config),
                endpoints,
                resources,
                transport,
                bindings,
            }),
        })
    }
}
