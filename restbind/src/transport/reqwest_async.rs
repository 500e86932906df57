use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;

use super::{header_map, AsyncTransport, TransportError};
use crate::error::ClientError;
use crate::request::{Body, FormPart, RequestSpec};
use crate::response::RawResponse;

/// Async transport backed by `reqwest::Client`.
///
/// Holds one pooled client that follows redirects and one that does not,
/// and picks between them per request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    following: reqwest::Client,
    direct: reqwest::Client,
}

impl ReqwestTransport {
    /// ## Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, ClientError> {
        Ok(Self {
            following: Self::client(Policy::default())?,
            direct: Self::client(Policy::none())?,
        })
    }

    fn client(policy: Policy) -> Result<reqwest::Client, ClientError> {
        reqwest::Client::builder()
            .redirect(policy)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(ClientError::Request)
    }

    async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
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
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response.bytes().await?;

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

impl AsyncTransport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a RequestSpec) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        self.execute(request).boxed()
    }
}
