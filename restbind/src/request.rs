//! Turning call arguments into a concrete request.
//!
//! [`build`] interpolates path tokens, validates query arguments and the
//! body against the endpoint's schemas, and copies headers, cookies, timeout,
//! auth and redirect policy from the effective configuration.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::auth::{Auth, Credential};
use crate::config::{check_headers, QueryPolicy};
use crate::endpoint::Endpoint;
use crate::endpoint_id::EndpointId;
use crate::error::{ApiError, ConfigError, FieldError, ValidationError};
use crate::method::RestMethod;
use crate::path::PathTemplate;
use crate::resolve::{overlay_headers, EffectiveConfig};
use crate::response::ResponseFormat;
use crate::schema::Schema;

/// An explicit request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Sent as `application/json`.
    Json(Value),
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Map<String, Value>),
    /// Sent as-is.
    Bytes {
        content: Bytes,
        content_type: Option<String>,
    },
    /// Sent as `multipart/form-data`; the transport encodes it and picks
    /// the boundary.
    Multipart(Vec<FormPart>),
}

/// One field of a multipart body: a file when it has a file name, a plain
/// form field otherwise.
///
/// ## Examples
///
/// ```rust
/// use restbind::FormPart;
///
/// let upload = FormPart::file("document", "report.pdf", b"%PDF-1.7".to_vec()).mime("application/pdf");
/// assert_eq!(upload.file_name.as_deref(), Some("report.pdf"));
///
/// let title = FormPart::text("title", "Q3 report");
/// assert!(title.file_name.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub content: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Bytes::from(value.into()),
            file_name: None,
            content_type: None,
        }
    }

    pub fn file(name: impl Into<String>, file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            file_name: Some(file_name.into()),
            content_type: None,
        }
    }

    /// Sets the part's own `Content-Type`.
    pub fn mime(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl Body {
    /// The `Content-Type` this body is sent with.
    ///
    /// `None` for multipart bodies, whose header carries a boundary only the
    /// transport knows.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Json(_) => Some("application/json"),
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
            Self::Bytes { content_type, .. } => content_type.as_deref(),
            Self::Multipart(_) => None,
        }
    }

    /// Encodes the body for the wire.
    ///
    /// Returns `None` for multipart bodies, which transports encode
    /// themselves.
    pub fn to_bytes(&self) -> Option<Bytes> {
        let bytes = match self {
            Self::Json(value) => Bytes::from(value.to_string()),
            Self::Form(fields) => {
                let mut form = url::form_urlencoded::Serializer::new(String::new());
                for (name, value) in fields {
                    let mut pairs = Vec::new();
                    if flatten(name, value, &mut pairs).is_ok() {
                        for (k, v) in pairs {
                            form.append_pair(&k, &v);
                        }
                    }
                }
                Bytes::from(form.finish())
            }
            Self::Bytes { content, .. } => content.clone(),
            Self::Multipart(_) => return None,
        };
        Some(bytes)
    }
}

/// Arguments for one call of a bound endpoint.
///
/// Named arguments fill path tokens first; the rest become query parameters
/// or, for endpoints with a request schema and no explicit body, the JSON
/// body. Per-call headers and timeout take precedence over every
/// configuration layer.
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use restbind::CallArgs;
///
/// let args = CallArgs::new()
///     .arg("id", 42)
///     .arg("expand", "posts")
///     .header("X-Request-Id", "abc")
///     .timeout(Duration::from_secs(2));
///
/// assert_eq!(args.get("id"), Some(&serde_json::json!(42)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    args: Map<String, Value>,
    body: Option<Body>,
    headers: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(args: Map<String, Value>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    /// Flattens a serializable struct into named arguments.
    ///
    /// ## Errors
    ///
    /// Fails if `value` does not serialize to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(args) => Ok(Self::from_map(args)),
            other => Err(serde::ser::Error::custom(format!(
                "call arguments must serialize to an object, got {}",
                kind(&other)
            ))),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    pub fn json(self, body: impl Into<Value>) -> Self {
        self.with_body(Body::Json(body.into()))
    }

    pub fn form(self, fields: Map<String, Value>) -> Self {
        self.with_body(Body::Form(fields))
    }

    pub fn bytes(self, content: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        self.with_body(Body::Bytes {
            content: content.into(),
            content_type: content_type.map(str::to_string),
        })
    }

    pub fn multipart(self, parts: Vec<FormPart>) -> Self {
        self.with_body(Body::Multipart(parts))
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.args.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.args.remove(name)
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }
}

impl From<Map<String, Value>> for CallArgs {
    fn from(args: Map<String, Value>) -> Self {
        Self::from_map(args)
    }
}

/// A fully built request, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub endpoint: EndpointId,
    pub method: RestMethod,
    /// Absolute URL without the query string.
    pub url: Url,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub body: Option<Body>,
    pub timeout: Duration,
    pub auth: Option<Auth>,
    pub follow_redirects: bool,
}

impl RequestSpec {
    /// The URL with query parameters and any query-string credential.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        let credential = self.auth.as_ref().map(Auth::credential);
        let auth_query = match &credential {
            Some(Credential::Query(name, key)) => Some((name, key)),
            _ => None,
        };

        if !self.query.is_empty() || auth_query.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
            if let Some((name, key)) = auth_query {
                pairs.append_pair(name, key);
            }
        }
        url
    }

    /// Every header to send: configured headers, the `Cookie` header, the
    /// body's `Content-Type` and any header credential.
    ///
    /// A configured `Cookie` header is merged with the cookie map, the map
    /// winning per cookie name. Configured headers win over the body's
    /// content type, except for multipart bodies whose boundary the
    /// transport sets. A header credential replaces a configured header of
    /// the same name.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        let mut headers = self.headers.clone();
        let has = |headers: &BTreeMap<String, String>, name: &str| {
            headers.keys().any(|k| k.eq_ignore_ascii_case(name))
        };

        if !self.cookies.is_empty() {
            let configured = take_header(&mut headers, "cookie");
            let mut jar: Vec<(String, String)> = configured
                .iter()
                .flat_map(|raw| raw.split(';'))
                .filter_map(|pair| {
                    let pair = pair.trim();
                    let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                    let name = name.trim();
                    (!name.is_empty() && !self.cookies.contains_key(name))
                        .then(|| (name.to_string(), value.trim().to_string()))
                })
                .collect();
            jar.extend(self.cookies.iter().map(|(k, v)| (k.clone(), v.clone())));

            let cookie = jar
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert("Cookie".to_string(), cookie);
        }

        match &self.body {
            Some(Body::Multipart(_)) => {
                take_header(&mut headers, "content-type");
            }
            Some(body) => {
                if let Some(content_type) = body.content_type() {
                    if !has(&headers, "content-type") {
                        headers.insert("Content-Type".to_string(), content_type.to_string());
                    }
                }
            }
            None => {}
        }

        if let Some(Credential::Header(name, value)) = self.auth.as_ref().map(Auth::credential) {
            overlay_headers(&mut headers, &BTreeMap::from([(name, value)]));
        }

        headers.into_iter().collect()
    }
}

/// Builds the request for one call.
///
/// `path` is the endpoint's full template, resource prefix included.
///
/// ## Errors
///
/// - [`ApiError::MissingParameter`] if any path token has no argument; this
///   is checked before anything else.
/// - [`ApiError::RequestValidation`] if a path value is not a scalar or is
///   exactly `.` or `..`, a query
///   argument or body fails its schema, or a query value cannot be encoded.
/// - [`ApiError::Config`] if a per-call header is invalid or the URL cannot
///   be formed.
pub fn build<F: ResponseFormat>(
    config: &EffectiveConfig,
    endpoint: &Endpoint<F>,
    path: &PathTemplate,
    args: CallArgs,
) -> Result<RequestSpec, ApiError> {
    let id = endpoint.id();
    let CallArgs {
        mut args,
        body,
        headers: call_headers,
        timeout: call_timeout,
    } = args;

    let missing: Vec<String> = path
        .tokens()
        .into_iter()
        .filter(|token| !args.contains_key(*token))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::MissingParameter {
            endpoint: id.to_string(),
            names: missing,
        });
    }

    let mut values = HashMap::new();
    let mut errors = Vec::new();
    for token in path.tokens() {
        let value = args.remove(token).unwrap_or(Value::Null);
        match scalar_text(&value) {
            // URL parsing resolves dot segments, which would change the route.
            Some(text) if text == "." || text == ".." => errors.push(FieldError::new(
                Some(token.to_string()),
                format!("path parameter cannot be the dot segment {text:?}"),
            )),
            Some(text) => {
                values.insert(token.to_string(), text);
            }
            None => errors.push(FieldError::new(
                Some(token.to_string()),
                format!("path parameter must be a string, number or boolean, got {}", kind(&value)),
            )),
        }
    }
    if !errors.is_empty() {
        return Err(invalid(id, errors, None));
    }

    let rendered = path.render(&values).map_err(|names| ApiError::MissingParameter {
        endpoint: id.to_string(),
        names,
    })?;
    let url = join(&config.base_url, &rendered)?;

    let (query, body) = match (endpoint.request_schema(), body) {
        (Some(schema), None) => {
            let payload = Value::Object(args);
            let validated = schema
                .validate(payload.clone())
                .map_err(|e| invalid(id, e.field_errors(), Some(payload)))?;
            (Vec::new(), Some(Body::Json(validated)))
        }
        (schema, body) => {
            let body = match (schema, body) {
                (Some(schema), Some(body)) => Some(validate_body(id, &**schema, body)?),
                (None, body) => body,
                (Some(_), None) => None,
            };
            if let Some(Body::Form(fields)) = &body {
                form_errors(fields).map_err(|errs| invalid(id, errs, None))?;
            }
            let query = build_query(id, config.query_policy, endpoint.query_schema(), args)?;
            (query, body)
        }
    };

    check_headers(&call_headers)?;
    let mut headers = config.headers.clone();
    overlay_headers(&mut headers, &call_headers);

    debug!(
        endpoint = %id,
        method = %endpoint.method(),
        url = %url,
        query_params = query.len(),
        has_body = body.is_some(),
        "built request"
    );

    Ok(RequestSpec {
        endpoint: id.clone(),
        method: endpoint.method(),
        url,
        query,
        headers,
        cookies: config.cookies.clone(),
        body,
        timeout: call_timeout.unwrap_or(config.timeout),
        auth: config.auth.clone(),
        follow_redirects: config.follow_redirects,
    })
}

/// Removes a header regardless of the case it was configured with.
fn take_header(headers: &mut BTreeMap<String, String>, name: &str) -> Option<String> {
    let key = headers.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()?;
    headers.remove(&key)
}

/// Appends a rendered path to the base URL, keeping any base path.
fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}{path}"))?)
}

fn validate_body(id: &EndpointId, schema: &dyn Schema, body: Body) -> Result<Body, ApiError> {
    match body {
        Body::Json(value) => schema
            .validate(value.clone())
            .map(Body::Json)
            .map_err(|e| invalid(id, e.field_errors(), Some(value))),
        Body::Form(fields) => {
            let payload = Value::Object(fields);
            match schema.validate(payload.clone()) {
                Ok(Value::Object(validated)) => Ok(Body::Form(validated)),
                Ok(other) => Err(invalid(
                    id,
                    vec![FieldError::new(
                        None,
                        format!("form body must validate to an object, got {}", kind(&other)),
                    )],
                    Some(payload),
                )),
                Err(e) => Err(invalid(id, e.field_errors(), Some(payload))),
            }
        }
        passthrough @ (Body::Bytes { .. } | Body::Multipart(_)) => Ok(passthrough),
    }
}

fn build_query(
    id: &EndpointId,
    policy: QueryPolicy,
    schema: Option<&std::sync::Arc<dyn Schema>>,
    args: Map<String, Value>,
) -> Result<Vec<(String, String)>, ApiError> {
    let fields = match schema {
        None => args,
        Some(schema) => {
            let raw = Value::Object(args.clone());
            let validated = schema
                .validate(raw.clone())
                .map_err(|e| invalid(id, e.field_errors(), Some(raw.clone())))?;
            let Value::Object(mut retained) = validated else {
                let err = ValidationError::Schema {
                    schema: schema.name().to_string(),
                    errors: vec![FieldError::new(None, "query schema must produce an object")],
                };
                return Err(invalid(id, err.field_errors(), Some(raw)));
            };

            let mut dropped = Vec::new();
            for (name, value) in args {
                if retained.contains_key(&name) || value.is_null() {
                    continue;
                }
                match policy {
                    QueryPolicy::Strict => dropped.push(FieldError::new(
                        Some(name),
                        format!("not a parameter of {}", schema.name()),
                    )),
                    QueryPolicy::Loose => {
                        retained.insert(name, value);
                    }
                }
            }
            if !dropped.is_empty() {
                return Err(invalid(id, dropped, Some(raw)));
            }
            retained
        }
    };

    let mut pairs = Vec::new();
    let mut errors = Vec::new();
    for (name, value) in &fields {
        if let Err(e) = flatten(name, value, &mut pairs) {
            errors.push(e);
        }
    }
    if errors.is_empty() {
        Ok(pairs)
    } else {
        Err(invalid(id, errors, Some(Value::Object(fields))))
    }
}

fn form_errors(fields: &Map<String, Value>) -> Result<(), Vec<FieldError>> {
    let mut scratch = Vec::new();
    let errors: Vec<FieldError> = fields
        .iter()
        .filter_map(|(name, value)| flatten(name, value, &mut scratch).err())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Encodes one named value as key/value pairs: scalars as text, arrays as a
/// repeated key, nulls dropped.
fn flatten(name: &str, value: &Value, out: &mut Vec<(String, String)>) -> Result<(), FieldError> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Null => {}
                    Value::Array(_) | Value::Object(_) => {
                        return Err(FieldError::new(
                            Some(name.to_string()),
                            format!("nested {} cannot be encoded as a parameter", kind(item)),
                        ))
                    }
                    scalar => {
                        if let Some(text) = scalar_text(scalar) {
                            out.push((name.to_string(), text));
                        }
                    }
                }
            }
            Ok(())
        }
        Value::Object(_) => Err(FieldError::new(
            Some(name.to_string()),
            "object cannot be encoded as a parameter",
        )),
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                out.push((name.to_string(), text));
            }
            Ok(())
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn invalid(id: &EndpointId, errors: Vec<FieldError>, raw: Option<Value>) -> ApiError {
    ApiError::RequestValidation {
        endpoint: id.to_string(),
        errors,
        raw,
    }
}
