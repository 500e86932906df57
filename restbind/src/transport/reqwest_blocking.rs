use std::time::Instant;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::redirect::Policy;

use super::{header_map, BlockingTransport, TransportError};
use crate::error::ClientError;
use crate::request::{Body, FormPart, RequestSpec};
use crate::response::RawResponse;

/// Blocking transport backed by `reqwest::blocking::Client`.
///
/// Must not be created or dropped inside an async runtime; reqwest's
/// blocking client runs its own.
#[derive(Debug, Clone)]
pub struct ReqwestBlockingTransport {
    following: reqwest::blocking::Client,
    direct: reqwest::blocking::Client,
}

impl ReqwestBlockingTransport {
    /// ## Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self {
            following: Self::client(Policy::default())?,
            direct: Self::client(Policy::none())?,
        })
    }

    fn client(policy: Policy) -> Result<reqwest::blocking::Client, ClientError> {
        reqwest::blocking::Client::builder()
            .redirect(policy)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(ClientError::Request)
    }
}

impl BlockingTransport for ReqwestBlockingTransport {
    fn send(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let mut builder = client
            .request(request.method.to_reqwest(), request.full_url())
            .headers(header_map(request)?)
            .timeout(request.timeout);
        match &request.body {
            Some(Body::Multipart(parts)) => builder = builder.multipart(multipart_form(parts)?),
            Some(body) => {
                if let Some(bytes) = body.to_bytes() {
                    builder = builder.body(bytes);
                }
            }
            None => {}
        }

        let started = Instant::now();
        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes()?;

        Ok(RawResponse {
            status,
            headers,
            url,
            elapsed: started.elapsed(),
            body,
        })
    }
}

fn multipart_form(parts: &[FormPart]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        let mut field = Part::bytes(part.content.to_vec());
        if let Some(file_name) = &part.file_name {
            field = field.file_name(file_name.clone());
        }
        if let Some(content_type) = &part.content_type {
            field = field.mime_str(content_type)?;
        }
        form = form.part(part.name.clone(), field);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use crate::endpoint_id::EndpointId;
    use crate::method::RestMethod;
    use url::Url;
    use wiremock::matchers::{body_string, body_string_contains, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec(uri: &str, route: &str) -> RequestSpec {
        RequestSpec {
            endpoint: EndpointId::new("test").unwrap(),
            method: RestMethod::Get,
            url: Url::parse(&format!("{uri}{route}")).unwrap(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            body: None,
            timeout: Duration::from_secs(5),
            auth: None,
            follow_redirects: false,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_send() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/notes/1"))
            .and(header("content-type", "text/plain"))
            .and(body_string("hello"))
            .respond_with(ResponseTemplate::new(200).set_body_string("saved"))
            .mount(&server)
            .await;

        let mut request = spec(&server.uri(), "/notes/1");
        request.method = RestMethod::Put;
        request.body = Some(Body::Bytes {
            content: bytes::Bytes::from("hello"),
            content_type: Some("text/plain".to_string()),
        });

        let raw = tokio::task::spawn_blocking(move || {
            let transport = ReqwestBlockingTransport::new().unwrap();
            transport.send(&request)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(raw.body, bytes::Bytes::from("saved"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_multipart_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .and(body_string_contains(r#"name="document"; filename="report.csv""#))
            .and(body_string_contains("a,b\n1,2"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let mut request = spec(&server.uri(), "/upload");
        request.method = RestMethod::Post;
        request.body = Some(Body::Multipart(vec![
            FormPart::file("document", "report.csv", "a,b\n1,2").mime("text/csv"),
        ]));

        let raw = tokio::task::spawn_blocking(move || {
            let transport = ReqwestBlockingTransport::new().unwrap();
            transport.send(&request)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(raw.status, 201);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_blocking_redirects_not_followed_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;

        let request = spec(&server.uri(), "/old");
        let raw = tokio::task::spawn_blocking(move || {
            let transport = ReqwestBlockingTransport::new().unwrap();
            transport.send(&request)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(raw.status, 301);
    }
}
