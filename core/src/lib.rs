//! Resource-oriented REST client.
//!
//! # Overview
//! Describe a REST resource once (its name and the operations it supports)
//! and call those operations by name. Each call resolves a registered request
//! template, validates its id and payload, substitutes the id into the path
//! and executes the request through a pluggable `Transport`.
//!
//! # Design
//! - `RequestTemplate`s are immutable; every call builds its own `Call`.
//! - `Resource` validates and routes; `Connection` turns a `Call` into an
//!   `HttpRequest` and an `HttpResponse` into a `Response`.
//! - Only `Transport` performs I/O, so request building is testable offline.
//! - `Resource::dispatch` runs the exchange on a worker thread and reports
//!   through a callback; validation errors are still returned synchronously.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod request;
pub mod resource;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::Client;
pub use config::{ClientConfig, ClientOptions, MethodDef, ResourceConfig, Scheme};
pub use connection::Connection;
pub use error::{Argument, Error, TransportError};
pub use http::{Body, HttpMethod, HttpRequest, HttpResponse, Response};
pub use request::{Args, Call, Id, Operation, Payload, RequestTemplate};
pub use resource::{Dispatched, Resource};
pub use transport::{Transport, UreqTransport};
