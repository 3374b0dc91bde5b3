//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. The default implementation
//! uses a blocking ureq agent configured from `ClientOptions`; tests swap in
//! an in-memory transport. Status codes are returned as data, never as
//! errors, so the connection decides what counts as a failure.

use std::sync::Arc;

use tracing::warn;
use ureq::tls::{Certificate, PemItem, RootCerts, TlsConfig};
use ureq::Agent;

use crate::config::ClientOptions;
use crate::error::{Error, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP exchange.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a shared ureq agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(options: &ClientOptions) -> Result<Self, Error> {
        let mut tls = TlsConfig::builder().disable_verification(options.insecure);
        if let Some(path) = &options.cert {
            let pem = std::fs::read(path)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
            let certs = load_certificates(&pem)?;
            if certs.is_empty() {
                return Err(Error::Config(format!(
                    "{}: no certificates found",
                    path.display()
                )));
            }
            tls = tls.root_certs(RootCerts::new_with_certs(&certs));
        }

        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(options.timeout())
            .tls_config(tls.build())
            .build()
            .new_agent();
        Ok(Self { agent })
    }
}

fn load_certificates(pem: &[u8]) -> Result<Vec<Certificate<'static>>, Error> {
    let mut certs = Vec::new();
    for item in ureq::tls::parse_pem(pem) {
        let item = item.map_err(|e| Error::Config(format!("invalid certificate bundle: {e}")))?;
        if let PemItem::Certificate(cert) = item {
            certs.push(cert.to_owned());
        }
    }
    Ok(certs)
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match method {
            HttpMethod::Get => send_optional_body(with_headers(self.agent.get(&url), &headers), body),
            HttpMethod::Delete => {
                send_optional_body(with_headers(self.agent.delete(&url), &headers), body)
            }
            HttpMethod::Post => send_body(with_headers(self.agent.post(&url), &headers), body),
            HttpMethod::Put => send_body(with_headers(self.agent.put(&url), &headers), body),
            HttpMethod::Patch => send_body(with_headers(self.agent.patch(&url), &headers), body),
        };

        let mut response = result.map_err(|e| {
            warn!(%method, %url, error = %e, "transport failure");
            match e {
                ureq::Error::Timeout(_) => TransportError::Timeout,
                ureq::Error::Io(ref io) if io.kind() == std::io::ErrorKind::TimedOut => {
                    TransportError::Timeout
                }
                other => TransportError::Io(other.to_string()),
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::Io(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// GET and DELETE carry no body unless the call supplied one.
fn send_optional_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithoutBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.force_send_body().send(body.as_bytes()),
        None => builder.call(),
    }
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
