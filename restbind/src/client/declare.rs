//! Type-erased storage for declared endpoints and their validators.
//!
//! A resource or client holds endpoints of many response types in one map.
//! Each entry remembers its concrete [`Endpoint<F>`] so binding can recover
//! it by downcasting with the caller's `F`.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::endpoint_id::EndpointId;
use crate::error::{ApiError, ConfigError, ValidatorError};
use crate::request::CallArgs;
use crate::response::{DataResponse, ResponseFormat};
use crate::validator::{boxed_wrap, Next, ValidatorChain};

pub(crate) trait DeclaredEndpoint: Send + Sync {
    fn id(&self) -> &EndpointId;
    fn chain_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
}

pub(crate) struct Declared<F: ResponseFormat> {
    pub(crate) endpoint: Endpoint<F>,
    pub(crate) chain: ValidatorChain<F::Output>,
}

impl<F: ResponseFormat> DeclaredEndpoint for Declared<F> {
    fn id(&self) -> &EndpointId {
        self.endpoint.id()
    }

    fn chain_mut(&mut self) -> &mut dyn Any {
        &mut self.chain
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) type EndpointMap = HashMap<EndpointId, Box<dyn DeclaredEndpoint>>;

type Apply = Box<dyn FnOnce(&mut dyn Any, &EndpointId) -> Result<(), ConfigError> + Send + Sync>;

struct Registration {
    id: EndpointId,
    apply: Apply,
}

/// Endpoints and validator registrations collected by a builder.
///
/// Registrations are checked against the endpoints when the owner is built,
/// so validators may be registered before or after their endpoint.
#[derive(Default)]
pub(crate) struct Declarations {
    endpoints: Vec<Box<dyn DeclaredEndpoint>>,
    registrations: Vec<Registration>,
}

impl Declarations {
    pub(crate) fn declare<F: ResponseFormat>(&mut self, endpoint: &Endpoint<F>) {
        self.endpoints.push(Box::new(Declared {
            endpoint: endpoint.clone(),
            chain: ValidatorChain::default(),
        }));
    }

    pub(crate) fn before<F, V>(&mut self, endpoint: &Endpoint<F>, validator: V)
    where
        F: ResponseFormat,
        V: Fn(CallArgs) -> Result<CallArgs, ValidatorError> + Send + Sync + 'static,
    {
        let validator = Arc::new(validator);
        self.register::<F, _>(endpoint.id(), move |chain, _| {
            chain.push_before(validator);
            Ok(())
        });
    }

    pub(crate) fn after<F, V>(&mut self, endpoint: &Endpoint<F>, validator: V)
    where
        F: ResponseFormat,
        V: Fn(DataResponse<F::Output>) -> Result<DataResponse<F::Output>, ValidatorError>
            + Send
            + Sync
            + 'static,
    {
        let validator = Arc::new(validator);
        self.register::<F, _>(endpoint.id(), move |chain, _| {
            chain.push_after(validator);
            Ok(())
        });
    }

    pub(crate) fn wrap<F, V, Fut>(&mut self, endpoint: &Endpoint<F>, validator: V)
    where
        F: ResponseFormat,
        V: Fn(Next<F::Output>, CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<DataResponse<F::Output>, ApiError>> + Send + 'static,
    {
        let validator = boxed_wrap(validator);
        self.register::<F, _>(endpoint.id(), move |chain, id| chain.set_wrap(id, validator));
    }

    fn register<F, A>(&mut self, id: &EndpointId, apply: A)
    where
        F: ResponseFormat,
        A: FnOnce(&mut ValidatorChain<F::Output>, &EndpointId) -> Result<(), ConfigError>
            + Send
            + Sync
            + 'static,
    {
        let apply = move |chain: &mut dyn Any, id: &EndpointId| {
            let chain = chain
                .downcast_mut::<ValidatorChain<F::Output>>()
                .ok_or_else(|| ConfigError::EndpointTypeMismatch { id: id.to_string() })?;
            apply(chain, id)
        };
        self.registrations.push(Registration {
            id: id.clone(),
            apply: Box::new(apply),
        });
    }

    /// Keys endpoints by id and installs every registered validator.
    ///
    /// ## Errors
    ///
    /// - [`ConfigError::DuplicateEndpoint`] if two endpoints share an id.
    /// - [`ConfigError::UnknownEndpoint`] if a validator names an undeclared endpoint.
    /// - [`ConfigError::EndpointTypeMismatch`] if a validator was registered
    ///   through a handle with a different response type.
    /// - [`ConfigError::DuplicateWrap`] for a second wrap validator.
    pub(crate) fn finish(self, owner: &str) -> Result<EndpointMap, ConfigError> {
        let mut endpoints = EndpointMap::new();
        for declared in self.endpoints {
            let id = declared.id().clone();
            if endpoints.contains_key(&id) {
                return Err(ConfigError::DuplicateEndpoint { id: id.to_string() });
            }
            endpoints.insert(id, declared);
        }

        for Registration { id, apply } in self.registrations {
            let declared = endpoints
                .get_mut(&id)
                .ok_or_else(|| ConfigError::UnknownEndpoint {
                    owner: owner.to_string(),
                    id: id.to_string(),
                })?;
            apply(declared.chain_mut(), &id)?;
        }

        Ok(endpoints)
    }
}

/// Finds the declaration of `id` with response format `F`.
pub(crate) fn lookup<'a, F: ResponseFormat>(
    endpoints: &'a EndpointMap,
    owner: &str,
    id: &EndpointId,
) -> Result<&'a Declared<F>, ConfigError> {
    let declared = endpoints.get(id).ok_or_else(|| ConfigError::UnknownEndpoint {
        owner: owner.to_string(),
        id: id.to_string(),
    })?;
    declared
        .as_any()
        .downcast_ref::<Declared<F>>()
        .ok_or_else(|| ConfigError::EndpointTypeMismatch { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{JsonFormat, PlainTextFormat};

    fn get_user() -> Endpoint<JsonFormat<serde_json::Value>> {
        Endpoint::get("get_user", "/users/{id}").build().unwrap()
    }

    #[test]
    fn test_finish_installs_validators() {
        let ep = get_user();
        let mut decls = Declarations::default();
        decls.before(&ep, Ok);
        decls.declare(&ep);
        decls.after(&ep, Ok);

        let endpoints = decls.finish("users").unwrap();
        let declared = lookup::<JsonFormat<serde_json::Value>>(&endpoints, "users", ep.id()).unwrap();
        assert!(declared.chain.has_after());
        assert_eq!(declared.endpoint.path().as_str(), "/users/{id}");
    }

    #[test]
    fn test_unknown_endpoint_registration() {
        let ep = get_user();
        let mut decls = Declarations::default();
        decls.before(&ep, Ok);

        let err = decls.finish("users").err().unwrap();
        assert!(matches!(err, ConfigError::UnknownEndpoint { ref owner, .. } if owner == "users"));
    }

    #[test]
    fn test_duplicate_endpoint() {
        let ep = get_user();
        let mut decls = Declarations::default();
        decls.declare(&ep);
        decls.declare(&ep);
        assert!(matches!(
            decls.finish("users").err().unwrap(),
            ConfigError::DuplicateEndpoint { .. }
        ));
    }

    #[test]
    fn test_duplicate_wrap() {
        let ep = get_user();
        let mut decls = Declarations::default();
        decls.declare(&ep);
        decls.wrap(&ep, |next: Next<serde_json::Value>, args| async move { next.run(args).await });
        decls.wrap(&ep, |next: Next<serde_json::Value>, args| async move { next.run(args).await });
        assert!(matches!(
            decls.finish("users").err().unwrap(),
            ConfigError::DuplicateWrap { .. }
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let ep = get_user();
        let text: Endpoint<PlainTextFormat> = Endpoint::get("get_user", "/users/{id}").build().unwrap();

        let mut decls = Declarations::default();
        decls.declare(&ep);
        decls.after(&text, Ok);
        assert!(matches!(
            decls.finish("users").err().unwrap(),
            ConfigError::EndpointTypeMismatch { .. }
        ));

        let mut decls = Declarations::default();
        decls.declare(&ep);
        let endpoints = decls.finish("users").unwrap();
        assert!(lookup::<PlainTextFormat>(&endpoints, "users", ep.id()).is_err());
    }
}
