//! Validation engine seam for query parameters and request bodies.
//!
//! A [`Schema`] takes a loosely-typed [`serde_json::Value`] and either
//! returns its canonical serialized form or rejects it with field-level
//! detail. [`SerdeSchema`] is the stock implementation, backed by a type's
//! `Deserialize` and `Serialize` impls.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{FieldError, ValidationError};

/// Validates and normalizes a payload.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Validates `value`, returning its serialized canonical form.
    fn validate(&self, value: Value) -> Result<Value, ValidationError>;
}

/// Schema backed by a serde type.
///
/// Validation deserializes into `T` and serializes the result back, so
/// defaults are filled in and fields `T` does not know are dropped (or
/// rejected, if `T` uses `#[serde(deny_unknown_fields)]`).
pub struct SerdeSchema<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T> {
    pub fn new() -> Self {
        let full = std::any::type_name::<T>();
        let name = full.rsplit("::").next().unwrap_or(full);
        Self {
            name,
            _type: PhantomData,
        }
    }
}

impl<T> Default for SerdeSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SerdeSchema").field(&self.name).finish()
    }
}

impl<T> Schema for SerdeSchema<T>
where
    T: Serialize + DeserializeOwned,
{
    fn name(&self) -> &str {
        self.name
    }

    fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        let typed: T = serde_json::from_value(value).map_err(|e| self.violation(&e))?;
        serde_json::to_value(&typed).map_err(|e| self.violation(&e))
    }
}

impl<T> SerdeSchema<T> {
    fn violation(&self, err: &serde_json::Error) -> ValidationError {
        ValidationError::Schema {
            schema: self.name.to_string(),
            errors: vec![FieldError::from_serde_message(&err.to_string())],
        }
    }
}

/// Shorthand for a shared [`SerdeSchema`].
///
/// ## Examples
///
/// ```rust
/// use restbind::schema::{schema, Schema};
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Page { page: u32 }
///
/// let page = schema::<Page>();
/// assert_eq!(page.name(), "Page");
/// assert!(page.validate(serde_json::json!({"page": 2})).is_ok());
/// assert!(page.validate(serde_json::json!({"page": "two"})).is_err());
/// ```
pub fn schema<T>() -> Arc<dyn Schema>
where
    T: Serialize + DeserializeOwned + 'static,
{
    Arc::new(SerdeSchema::<T>::new())
}
