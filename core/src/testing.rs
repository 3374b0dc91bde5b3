//! In-memory transport for unit tests.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::json;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

/// Records every request and answers 200 with a JSON echo of method and URL.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    status: u16,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self {
            status: 200,
            ..Self::default()
        }
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sleep this long before answering; longer for URLs ending in `/1`.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Some(delay) = self.delay {
            let factor = if request.url.ends_with("/1") { 3 } else { 1 };
            thread::sleep(delay * factor);
        }
        let body = json!({
            "method": request.method.as_str(),
            "url": request.url,
            "body": request.body,
        })
        .to_string();
        self.requests.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: self.status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        })
    }
}
