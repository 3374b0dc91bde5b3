//! Error types for resource dispatch and request execution.
//!
//! # Design
//! Validation failures (`UnsupportedOperation`, `UnknownOperation`,
//! `MissingArgument`) are raised before any request leaves the process, so
//! callers always see them synchronously. Everything that happens on the wire
//! lands in `Transport`, which keeps the raw status code and body of non-2xx
//! responses for debugging.

use std::fmt;

use thiserror::Error;

/// Errors returned by resources, the client and its connection.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource exists but was not registered with this operation.
    #[error("resource `{resource}` does not support operation `{operation}`")]
    UnsupportedOperation { resource: String, operation: String },

    /// No request template is registered under this name.
    #[error("resource `{resource}` has no operation named `{operation}`")]
    UnknownOperation { resource: String, operation: String },

    /// No resource is registered under this name.
    #[error("no resource named `{0}` is registered")]
    UnknownResource(String),

    /// A required id or payload was absent or empty.
    #[error("operation `{operation}` on resource `{resource}` requires a non-empty {argument}")]
    MissingArgument {
        resource: String,
        operation: String,
        argument: Argument,
    },

    /// The HTTP call itself failed or the server answered with a non-2xx status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The payload could not be encoded for the configured content type.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response claimed to be JSON but could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// Options or a configuration document were rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The worker thread for a dispatched call could not be started.
    #[error("failed to spawn dispatch worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl Error {
    /// True when the server answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Status { status: 404, .. }))
    }
}

/// Failures of the HTTP round-trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server returned a status outside 200..=299.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The configured timeout expired before the exchange completed.
    #[error("request timed out")]
    Timeout,

    /// Connection, DNS, TLS or I/O failure.
    #[error("transport failure: {0}")]
    Io(String),
}

/// The per-call argument a precondition was checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    Id,
    Payload,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Id => write!(f, "id"),
            Argument::Payload => write!(f, "payload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_resource_operation_and_argument() {
        let err = Error::MissingArgument {
            resource: "people".to_string(),
            operation: "get".to_string(),
            argument: Argument::Id,
        };
        assert_eq!(
            err.to_string(),
            "operation `get` on resource `people` requires a non-empty id"
        );

        let err = Error::UnsupportedOperation {
            resource: "people".to_string(),
            operation: "delete".to_string(),
        };
        assert_eq!(err.to_string(), "resource `people` does not support operation `delete`");
    }

    #[test]
    fn not_found_is_recognised_only_for_404() {
        let not_found = Error::from(TransportError::Status {
            status: 404,
            body: String::new(),
        });
        assert!(not_found.is_not_found());

        let server_error = Error::from(TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        });
        assert!(!server_error.is_not_found());
        assert_eq!(server_error.to_string(), "HTTP 500: boom");
    }
}
