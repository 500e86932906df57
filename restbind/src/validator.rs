//! Before, after and wrap validators.
//!
//! Validators are registered per endpoint id when a resource or client is
//! declared. `before` validators rewrite call arguments, `after` validators
//! rewrite decoded responses, and a single `wrap` validator surrounds the
//! whole call with a [`Next`] handle it may invoke any number of times.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use strum::{Display, EnumString};

use crate::endpoint_id::EndpointId;
use crate::error::{ApiError, ConfigError, ValidatorError};
use crate::request::CallArgs;
use crate::response::DataResponse;

/// The pipeline stage a validator runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ValidatorMode {
    Before,
    After,
    Wrap,
}

pub(crate) type BeforeFn = dyn Fn(CallArgs) -> Result<CallArgs, ValidatorError> + Send + Sync;
pub(crate) type AfterFn<O> =
    dyn Fn(DataResponse<O>) -> Result<DataResponse<O>, ValidatorError> + Send + Sync;
pub(crate) type WrapFn<O> = dyn Fn(Next<O>, CallArgs) -> BoxFuture<'static, Result<DataResponse<O>, ApiError>>
    + Send
    + Sync;

/// Runs the rest of the pipeline for one set of arguments.
pub(crate) trait Handler<O>: Send + Sync {
    fn handle(&self, args: CallArgs) -> BoxFuture<'static, Result<DataResponse<O>, ApiError>>;
}

/// The remainder of the pipeline, handed to a wrap validator.
///
/// Each [`run`](Next::run) executes before validators, request building,
/// the transport call, response decoding and after validators. A wrap
/// validator may call it zero, one or many times.
pub struct Next<O> {
    handler: Arc<dyn Handler<O>>,
}

impl<O> Next<O> {
    pub(crate) fn new(handler: Arc<dyn Handler<O>>) -> Self {
        Self { handler }
    }

    pub fn run(&self, args: CallArgs) -> BoxFuture<'static, Result<DataResponse<O>, ApiError>> {
        self.handler.handle(args)
    }
}

impl<O> Clone for Next<O> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<O> fmt::Debug for Next<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Next")
    }
}

/// Every validator registered for one endpoint, in registration order.
pub(crate) struct ValidatorChain<O> {
    before: Vec<Arc<BeforeFn>>,
    after: Vec<Arc<AfterFn<O>>>,
    wrap: Option<Arc<WrapFn<O>>>,
}

impl<O> Default for ValidatorChain<O> {
    fn default() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            wrap: None,
        }
    }
}

impl<O> Clone for ValidatorChain<O> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
            wrap: self.wrap.clone(),
        }
    }
}

impl<O: Send + 'static> ValidatorChain<O> {
    pub(crate) fn push_before(&mut self, validator: Arc<BeforeFn>) {
        self.before.push(validator);
    }

    pub(crate) fn push_after(&mut self, validator: Arc<AfterFn<O>>) {
        self.after.push(validator);
    }

    /// Installs the wrap validator.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::DuplicateWrap`] if one is already installed.
    pub(crate) fn set_wrap(&mut self, id: &EndpointId, validator: Arc<WrapFn<O>>) -> Result<(), ConfigError> {
        if self.wrap.is_some() {
            return Err(ConfigError::DuplicateWrap { id: id.to_string() });
        }
        self.wrap = Some(validator);
        Ok(())
    }

    pub(crate) fn has_after(&self) -> bool {
        !self.after.is_empty()
    }

    pub(crate) fn wrap(&self) -> Option<&Arc<WrapFn<O>>> {
        self.wrap.as_ref()
    }

    /// Feeds `args` through every before validator in order.
    pub(crate) fn run_before(&self, id: &EndpointId, args: CallArgs) -> Result<CallArgs, ApiError> {
        self.before.iter().try_fold(args, |args, validator| {
            validator(args).map_err(|source| ApiError::Validator {
                endpoint: id.to_string(),
                mode: ValidatorMode::Before,
                source,
            })
        })
    }

    /// Feeds `response` through every after validator in order.
    pub(crate) fn run_after(
        &self,
        id: &EndpointId,
        response: DataResponse<O>,
    ) -> Result<DataResponse<O>, ApiError> {
        self.after.iter().try_fold(response, |response, validator| {
            validator(response).map_err(|source| ApiError::Validator {
                endpoint: id.to_string(),
                mode: ValidatorMode::After,
                source,
            })
        })
    }
}

/// Boxes a wrap validator that returns any sendable future.
pub(crate) fn boxed_wrap<O, V, Fut>(validator: V) -> Arc<WrapFn<O>>
where
    O: Send + 'static,
    V: Fn(Next<O>, CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DataResponse<O>, ApiError>> + Send + 'static,
{
    Arc::new(move |next: Next<O>, args: CallArgs| validator(next, args).boxed())
}
