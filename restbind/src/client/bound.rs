//! Bound endpoints and the call pipeline.
//!
//! A [`Bound`] pairs one declared endpoint with everything needed to call
//! it: the owning client and resource configuration, the validator chain and
//! the transport. Blocking and suspending calls share [`Pipeline::prepare`]
//! and [`Pipeline::finish`]; they differ only in how the transport is invoked.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{instrument, warn, Span};

use super::{Blocking, Mode, Suspending};
use crate::config::{ClientConfig, ResourceConfig};
use crate::endpoint::Endpoint;
use crate::error::{ApiError, ClientError};
use crate::path::PathTemplate;
use crate::request::{self, CallArgs, RequestSpec};
use crate::resolve::resolve;
use crate::response::{decode, DataResponse, RawResponse, ResponseFormat};
use crate::transport::{AsyncTransport, BlockingTransport};
use crate::validator::{Handler, Next, ValidatorChain};

/// Everything a call needs apart from the transport.
pub(crate) struct Pipeline<F: ResponseFormat> {
    pub(crate) owner: String,
    pub(crate) endpoint: Endpoint<F>,
    pub(crate) path: PathTemplate,
    pub(crate) client: Arc<ClientConfig>,
    pub(crate) resource: Option<Arc<ResourceConfig>>,
    pub(crate) chain: ValidatorChain<F::Output>,
}

struct Prepared {
    request: RequestSpec,
    raise_on_error: bool,
}

impl<F: ResponseFormat> Pipeline<F> {
    /// Before validators, configuration merge and request building.
    fn prepare(&self, args: CallArgs) -> Result<Prepared, ApiError> {
        let args = self.chain.run_before(self.endpoint.id(), args)?;
        let effective = resolve(&self.client, self.resource.as_deref(), self.endpoint.overrides());
        let raise_on_error = effective.raise_on_error;
        let request = request::build(&effective, &self.endpoint, &self.path, args)?;

        Span::current().record("http.method", request.method.as_str());
        Span::current().record("http.url", request.url.as_str());

        Ok(Prepared {
            request,
            raise_on_error,
        })
    }

    /// Status policy, decoding and after validators.
    fn finish(&self, raw: RawResponse, raise_on_error: bool) -> Result<DataResponse<F::Output>, ApiError> {
        let status = raw.status;
        Span::current().record("http.status_code", status);

        if raw.is_success() {
            Span::current().record("otel.status_code", "OK");
        } else {
            let otel_status = if status >= 500 { "ERROR" } else { "UNSET" };
            Span::current().record("otel.status_code", otel_status);
            warn!(endpoint = %self.endpoint.id(), status, url = %raw.url, "non-success status");
        }

        let response = decode::<F>(raw, raise_on_error && !self.chain.has_after())?;
        self.chain.run_after(self.endpoint.id(), response)
    }
}

struct BlockingHandler<F: ResponseFormat> {
    pipeline: Arc<Pipeline<F>>,
    transport: Arc<dyn BlockingTransport>,
}

impl<F: ResponseFormat> BlockingHandler<F> {
    #[instrument(
        name = "api_request",
        skip_all,
        fields(
            endpoint = %self.pipeline.endpoint.id(),
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    fn run(&self, args: CallArgs) -> Result<DataResponse<F::Output>, ApiError> {
        let prepared = self.pipeline.prepare(args)?;
        let timeout = prepared.request.timeout;
        let raw = self
            .transport
            .send(&prepared.request)
            .map_err(|e| e.into_api_error(timeout))?;
        self.pipeline.finish(raw, prepared.raise_on_error)
    }
}

impl<F: ResponseFormat> Handler<F::Output> for BlockingHandler<F> {
    fn handle(&self, args: CallArgs) -> BoxFuture<'static, Result<DataResponse<F::Output>, ApiError>> {
        futures::future::ready(self.run(args)).boxed()
    }
}

struct AsyncHandler<F: ResponseFormat> {
    pipeline: Arc<Pipeline<F>>,
    transport: Arc<dyn AsyncTransport>,
}

impl<F: ResponseFormat> AsyncHandler<F> {
    #[instrument(
        name = "api_request",
        skip_all,
        fields(
            endpoint = %pipeline.endpoint.id(),
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    async fn run(
        pipeline: Arc<Pipeline<F>>,
        transport: Arc<dyn AsyncTransport>,
        args: CallArgs,
    ) -> Result<DataResponse<F::Output>, ApiError> {
        let prepared = pipeline.prepare(args)?;
        let timeout = prepared.request.timeout;
        let raw = match tokio::time::timeout(timeout, transport.send(&prepared.request)).await {
            Ok(sent) => sent.map_err(|e| e.into_api_error(timeout))?,
            Err(_) => return Err(ApiError::Timeout { after: timeout }),
        };
        pipeline.finish(raw, prepared.raise_on_error)
    }
}

impl<F: ResponseFormat> Handler<F::Output> for AsyncHandler<F> {
    fn handle(&self, args: CallArgs) -> BoxFuture<'static, Result<DataResponse<F::Output>, ApiError>> {
        Self::run(Arc::clone(&self.pipeline), Arc::clone(&self.transport), args).boxed()
    }
}

/// An endpoint bound to a client, ready to call.
///
/// Obtained from [`Client::bind`](super::Client::bind) or
/// [`Resource::bind`](super::Resource::bind). Cloning is cheap and clones
/// share the same pipeline.
pub struct Bound<F: ResponseFormat, M: Mode> {
    pipeline: Arc<Pipeline<F>>,
    transport: Arc<M::Transport>,
}

impl<F: ResponseFormat, M: Mode> Bound<F, M> {
    pub(crate) fn new(pipeline: Pipeline<F>, transport: Arc<M::Transport>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            transport,
        }
    }

    /// The endpoint descriptor.
    pub fn endpoint(&self) -> &Endpoint<F> {
        &self.pipeline.endpoint
    }

    /// Resource prefix joined with the endpoint path.
    pub fn path(&self) -> &PathTemplate {
        &self.pipeline.path
    }

    /// `client` or the owning resource's id.
    pub fn owner(&self) -> &str {
        &self.pipeline.owner
    }

    #[cfg(test)]
    pub(crate) fn shares_pipeline(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pipeline, &other.pipeline)
    }
}

impl<F: ResponseFormat> Bound<F, Blocking> {
    /// Calls the endpoint on the current thread.
    ///
    /// A wrap validator, if any, is driven to completion here on a
    /// current-thread tokio runtime with timers enabled, so it may await
    /// `tokio::time::sleep` between attempts. Each [`Next::run`] it makes
    /// performs a full blocking call.
    ///
    /// Like any blocking client call, this must not be made from inside an
    /// async runtime.
    ///
    /// ## Errors
    ///
    /// Any [`ApiError`]; pre-send failures never reach the transport.
    pub fn call(&self, args: CallArgs) -> Result<DataResponse<F::Output>, ApiError> {
        let handler = BlockingHandler {
            pipeline: Arc::clone(&self.pipeline),
            transport: Arc::clone(&self.transport),
        };
        let Some(wrap) = self.pipeline.chain.wrap() else {
            return handler.run(args);
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| ClientError::Other(Box::new(e)))?;
        runtime.block_on(wrap(Next::new(Arc::new(handler)), args))
    }
}

impl<F: ResponseFormat> Bound<F, Suspending> {
    /// Calls the endpoint, suspending only while the transport is sending.
    ///
    /// The send is bounded by the effective timeout.
    ///
    /// ## Errors
    ///
    /// Any [`ApiError`]; pre-send failures never reach the transport.
    pub async fn call(&self, args: CallArgs) -> Result<DataResponse<F::Output>, ApiError> {
        match self.pipeline.chain.wrap() {
            Some(wrap) => {
                let handler = AsyncHandler {
                    pipeline: Arc::clone(&self.pipeline),
                    transport: Arc::clone(&self.transport),
                };
                wrap(Next::new(Arc::new(handler)), args).await
            }
            None => AsyncHandler::run(Arc::clone(&self.pipeline), Arc::clone(&self.transport), args).await,
        }
    }
}

impl<F: ResponseFormat, M: Mode> Clone for Bound<F, M> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<F: ResponseFormat, M: Mode> fmt::Debug for Bound<F, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bound")
            .field("owner", &self.pipeline.owner)
            .field("endpoint", self.pipeline.endpoint.id())
            .field("method", &self.pipeline.endpoint.method())
            .field("path", &self.pipeline.path.as_str())
            .finish()
    }
}
