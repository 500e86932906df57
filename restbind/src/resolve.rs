//! Merging of client, resource and endpoint configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

use crate::auth::Auth;
use crate::config::{ClientConfig, EndpointOverrides, QueryPolicy, ResourceConfig};

/// The configuration in force for one call of one endpoint.
///
/// Built fresh by [`resolve`] for every call and dropped afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub follow_redirects: bool,
    pub auth: Option<Auth>,
    pub raise_on_error: bool,
    pub query_policy: QueryPolicy,
}

/// Merges the three configuration layers; the most specific layer wins.
///
/// Header names are matched case-insensitively, so an endpoint's
/// `content-type` replaces a client's `Content-Type`. Cookies are matched
/// exactly. Scalars come from the innermost layer that sets them. The base
/// URL and query policy only ever come from the client.
///
/// No input is modified.
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use restbind::config::{ClientConfig, EndpointOverrides, ResourceConfig};
/// use restbind::resolve::resolve;
///
/// let client = ClientConfig::new("https://api.example.com")
///     .unwrap()
///     .with_header("Accept", "application/json");
/// let resource = ResourceConfig::new("/users").with_timeout(Duration::from_secs(5));
/// let endpoint = EndpointOverrides {
///     timeout: Some(Duration::from_secs(1)),
///     ..EndpointOverrides::default()
/// };
///
/// let effective = resolve(&client, Some(&resource), &endpoint);
/// assert_eq!(effective.timeout, Duration::from_secs(1));
/// assert_eq!(effective.headers["Accept"], "application/json");
/// ```
pub fn resolve(
    client: &ClientConfig,
    resource: Option<&ResourceConfig>,
    endpoint: &EndpointOverrides,
) -> EffectiveConfig {
    let mut headers = client.headers.clone();
    let mut cookies = client.cookies.clone();
    let mut timeout = client.timeout;
    let mut follow_redirects = client.follow_redirects;
    let mut auth = client.auth.clone();
    let mut raise_on_error = client.raise_on_error;

    if let Some(resource) = resource {
        overlay_headers(&mut headers, &resource.headers);
        overlay(&mut cookies, &resource.cookies);
        timeout = resource.timeout.unwrap_or(timeout);
        follow_redirects = resource.follow_redirects.unwrap_or(follow_redirects);
        auth = resource.auth.clone().or(auth);
        raise_on_error = resource.raise_on_error.unwrap_or(raise_on_error);
    }

    overlay_headers(&mut headers, &endpoint.headers);
    overlay(&mut cookies, &endpoint.cookies);
    timeout = endpoint.timeout.unwrap_or(timeout);
    follow_redirects = endpoint.follow_redirects.unwrap_or(follow_redirects);
    auth = endpoint.auth.clone().or(auth);

    EffectiveConfig {
        base_url: client.base_url.clone(),
        timeout,
        headers,
        cookies,
        follow_redirects,
        auth,
        raise_on_error,
        query_policy: client.query_policy,
    }
}

/// Overlays `layer` onto `base`, replacing entries whose names match
/// case-insensitively.
pub(crate) fn overlay_headers(base: &mut BTreeMap<String, String>, layer: &BTreeMap<String, String>) {
    for (name, value) in layer {
        base.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        base.insert(name.clone(), value.clone());
    }
}

fn overlay(base: &mut BTreeMap<String, String>, layer: &BTreeMap<String, String>) {
    for (name, value) in layer {
        base.insert(name.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientConfig {
        ClientConfig::new("https://api.example.com")
            .unwrap()
            .with_header("Accept", "application/json")
            .with_header("X-Client", "1")
            .with_cookie("session", "client")
            .with_auth(Auth::bearer("client-token"))
    }

    #[test]
    fn test_identity_without_overrides() {
        let client = client();
        let effective = resolve(&client, None, &EndpointOverrides::default());

        assert_eq!(effective.base_url, client.base_url);
        assert_eq!(effective.timeout, client.timeout);
        assert_eq!(effective.headers, client.headers);
        assert_eq!(effective.cookies, client.cookies);
        assert_eq!(effective.follow_redirects, client.follow_redirects);
        assert_eq!(effective.auth, client.auth);
        assert_eq!(effective.raise_on_error, client.raise_on_error);
        assert_eq!(effective.query_policy, client.query_policy);

        let empty_resource = ResourceConfig::new("/users");
        let through_resource = resolve(&client, Some(&empty_resource), &EndpointOverrides::default());
        assert_eq!(through_resource, effective);
    }

    #[test]
    fn test_endpoint_beats_resource_beats_client() {
        let client = client();
        let resource = ResourceConfig::new("/users")
            .with_timeout(Duration::from_secs(5))
            .with_follow_redirects(true)
            .with_auth(Auth::bearer("resource-token"))
            .with_header("X-Resource", "r");
        let endpoint = EndpointOverrides {
            timeout: Some(Duration::from_secs(1)),
            auth: Some(Auth::api_key("X-Key", "k")),
            ..EndpointOverrides::default()
        };

        let effective = resolve(&client, Some(&resource), &endpoint);
        assert_eq!(effective.timeout, Duration::from_secs(1));
        assert!(effective.follow_redirects);
        assert_eq!(effective.auth, Some(Auth::api_key("X-Key", "k")));
        assert_eq!(effective.headers.len(), 3);
        assert_eq!(effective.headers["X-Resource"], "r");
    }

    #[test]
    fn test_headers_union_case_insensitive() {
        let client = client();
        let resource = ResourceConfig::new("").with_header("accept", "text/plain");
        let endpoint = EndpointOverrides {
            headers: BTreeMap::from([("ACCEPT".to_string(), "application/xml".to_string())]),
            ..EndpointOverrides::default()
        };

        let effective = resolve(&client, Some(&resource), &endpoint);
        let accepts: Vec<_> = effective
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
            .collect();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].1, "application/xml");
        assert_eq!(effective.headers["X-Client"], "1");
    }

    #[test]
    fn test_cookies_exact_match() {
        let client = client();
        let endpoint = EndpointOverrides {
            cookies: BTreeMap::from([
                ("session".to_string(), "endpoint".to_string()),
                ("Session".to_string(), "other".to_string()),
            ]),
            ..EndpointOverrides::default()
        };

        let effective = resolve(&client, None, &endpoint);
        assert_eq!(effective.cookies["session"], "endpoint");
        assert_eq!(effective.cookies["Session"], "other");
    }

    #[test]
    fn test_resource_raise_on_error() {
        let client = client();
        let resource = ResourceConfig::new("").with_raise_on_error(false);
        assert!(!resolve(&client, Some(&resource), &EndpointOverrides::default()).raise_on_error);
    }

    #[test]
    fn test_inputs_untouched() {
        let client = client();
        let before = client.clone();
        let endpoint = EndpointOverrides {
            headers: BTreeMap::from([("accept".to_string(), "x".to_string())]),
            ..EndpointOverrides::default()
        };
        let _ = resolve(&client, None, &endpoint);
        assert_eq!(client, before);
    }
}
