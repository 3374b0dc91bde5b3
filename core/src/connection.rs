//! Shared connection state: base URL, headers and the transport.
//!
//! # Design
//! A `Connection` is a cheap handle around an `Arc`, cloned into every
//! resource and every dispatched worker. Building a request is split from
//! executing it, mirroring the build/parse split of a host-does-IO client:
//! `build_request` is pure and snapshots the header set, `send` performs the
//! exchange and `parse_response` interprets it.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::ClientOptions;
use crate::error::{Error, TransportError};
use crate::http::{find_header, Body, HttpRequest, HttpResponse, Response};
use crate::request::{Call, Payload};
use crate::transport::{Transport, UreqTransport};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const USER_AGENT: &str = "User-Agent";

#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    options: ClientOptions,
    headers: RwLock<Vec<(String, String)>>,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.inner.base_url)
            .field("headers", &self.headers())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect to `host` over the default ureq transport.
    pub fn new(host: &str, options: ClientOptions) -> Result<Self, Error> {
        let transport = UreqTransport::new(&options)?;
        Ok(Self::with_transport(host, options, transport))
    }

    pub fn with_transport(
        host: &str,
        options: ClientOptions,
        transport: impl Transport + 'static,
    ) -> Self {
        let mut base_url = format!("{}://{}", options.scheme, host.trim_end_matches('/'));
        if let Some(port) = options.port {
            base_url.push_str(&format!(":{port}"));
        }
        if let Some(version) = options.version_segment() {
            base_url.push('/');
            base_url.push_str(&version);
        }

        let mut headers = Vec::new();
        if let Some(content_type) = &options.content_type {
            headers.push((CONTENT_TYPE.to_string(), content_type.clone()));
        }
        if let Some(user_agent) = &options.user_agent {
            headers.push((USER_AGENT.to_string(), user_agent.clone()));
        }

        Self {
            inner: Arc::new(Inner {
                base_url,
                options,
                headers: RwLock::new(headers),
                transport: Box::new(transport),
            }),
        }
    }

    /// `scheme://host[:port][/version]`, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Set a header on every subsequent request, replacing any header with
    /// the same name regardless of case.
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut headers = self
            .inner
            .headers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        headers.push((name, value));
    }

    /// Snapshot of the current header set.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.inner
            .headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn url_for(&self, call: &Call) -> String {
        let mut url = format!("{}/{}", self.inner.base_url, call.resource().trim_matches('/'));
        let path = call.path();
        if !path.is_empty() {
            url.push('/');
            url.push_str(&path);
        }
        url
    }

    pub fn build_request(&self, call: &Call) -> Result<HttpRequest, Error> {
        let headers = self.headers();
        let body = match call.payload() {
            Some(payload) => Some(encode_payload(payload, find_header(&headers, CONTENT_TYPE))?),
            None => None,
        };
        let url = self.url_for(call);
        trace!(resource = call.resource(), operation = call.name(), %url, "built request");
        Ok(HttpRequest {
            method: call.method(),
            url,
            headers,
            body,
        })
    }

    /// Execute a prepared request and interpret the response.
    pub fn send(&self, request: HttpRequest) -> Result<Response, Error> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.inner.transport.send(request)?;
        debug!(%method, %url, status = response.status, "response received");
        parse_response(response)
    }

    pub fn execute(&self, call: &Call) -> Result<Response, Error> {
        let request = self.build_request(call)?;
        self.send(request)
    }
}

/// Serialize a payload for the given content type.
///
/// JSON content types (or none at all) get JSON. A string payload is sent
/// verbatim for any other content type; structured payloads cannot be.
fn encode_payload(payload: &Payload, content_type: Option<&str>) -> Result<String, Error> {
    let is_json = content_type.map_or(true, |ct| ct.to_ascii_lowercase().contains("json"));
    match payload {
        Value::String(raw) if !is_json => Ok(raw.clone()),
        _ if is_json => {
            serde_json::to_string(payload).map_err(|e| Error::Serialization(e.to_string()))
        }
        _ => Err(Error::Serialization(format!(
            "cannot encode a structured payload as `{}`",
            content_type.unwrap_or_default()
        ))),
    }
}

/// Map non-2xx statuses to `TransportError::Status` and decode the body.
pub fn parse_response(response: HttpResponse) -> Result<Response, Error> {
    if !(200..300).contains(&response.status) {
        warn!(status = response.status, "request failed");
        return Err(TransportError::Status {
            status: response.status,
            body: response.body,
        }
        .into());
    }

    let is_json = response
        .header(CONTENT_TYPE)
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    let body = if is_json && !response.body.trim().is_empty() {
        Body::Json(
            serde_json::from_str(&response.body)
                .map_err(|e| Error::Deserialization(e.to_string()))?,
        )
    } else {
        Body::Text(response.body)
    };

    Ok(Response {
        status: response.status,
        headers: response.headers,
        body,
    })
}
