//! Named REST resources and operation dispatch.
//!
//! # Design
//! A `Resource` owns the request templates registered for it plus a handle on
//! the shared `Connection`. Every entry point funnels through `prepare`, which
//! checks the operation and its arguments and produces a fresh `Call`; the
//! registered templates are never mutated by a call. `dispatch` validates and
//! builds the request on the caller's thread, then hands only the exchange
//! and the callback to a worker thread.

use std::collections::{BTreeSet, HashMap};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::connection::Connection;
use crate::error::{Argument, Error};
use crate::http::Response;
use crate::request::{Args, Call, Id, Operation, Payload, RequestTemplate};

#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    supported: BTreeSet<Operation>,
    requests: HashMap<String, RequestTemplate>,
    connection: Connection,
}

impl Resource {
    /// Create a resource exposing `operations` with their default templates.
    pub fn new(
        name: impl Into<String>,
        operations: impl IntoIterator<Item = Operation>,
        connection: Connection,
    ) -> Self {
        let supported: BTreeSet<Operation> = operations.into_iter().collect();
        let requests = supported
            .iter()
            .map(|op| (op.as_str().to_string(), RequestTemplate::from_operation(*op)))
            .collect();
        Self {
            name: name.into(),
            supported,
            requests,
            connection,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.supported.contains(&operation)
    }

    pub fn template(&self, name: &str) -> Option<&RequestTemplate> {
        self.requests.get(name)
    }

    /// Names of every registered template, sorted.
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.requests.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Register a custom template, replacing any template with the same name.
    ///
    /// Overriding a default operation changes its verb and path only; the
    /// operation must still be supported to be callable.
    pub fn register(&mut self, template: RequestTemplate) -> Option<RequestTemplate> {
        debug!(
            resource = %self.name,
            operation = template.name(),
            method = %template.method(),
            path = template.path(),
            "registered operation"
        );
        self.requests.insert(template.name().to_string(), template)
    }

    pub fn list(&self) -> Result<Response, Error> {
        self.invoke(Operation::List.as_str(), Args::none())
    }

    pub fn get(&self, id: impl Into<Id>) -> Result<Response, Error> {
        self.invoke(Operation::Get.as_str(), Args::id(id))
    }

    pub fn create(&self, payload: Payload) -> Result<Response, Error> {
        self.invoke(Operation::Create.as_str(), Args::payload(payload))
    }

    pub fn update(&self, id: impl Into<Id>, payload: Payload) -> Result<Response, Error> {
        self.invoke(Operation::Update.as_str(), Args::id(id).with_payload(payload))
    }

    pub fn delete(&self, id: impl Into<Id>) -> Result<Response, Error> {
        self.invoke(Operation::Delete.as_str(), Args::id(id))
    }

    /// Run any registered operation and block until it completes.
    pub fn invoke(&self, name: &str, args: Args) -> Result<Response, Error> {
        let call = self.prepare(name, args)?;
        self.connection.execute(&call)
    }

    /// Run an operation on a worker thread and hand the outcome to `callback`.
    ///
    /// Validation and request building happen before this returns, so those
    /// errors come back here and `callback` is never invoked for them. Once
    /// `Ok` is returned, `callback` runs exactly once with the response or
    /// the transport failure.
    pub fn dispatch<F>(&self, name: &str, args: Args, callback: F) -> Result<Dispatched, Error>
    where
        F: FnOnce(Result<Response, Error>) + Send + 'static,
    {
        let call = self.prepare(name, args)?;
        let request = self.connection.build_request(&call)?;
        let connection = self.connection.clone();

        let handle = thread::Builder::new()
            .name(format!("{}-{}", self.name, call.name()))
            .spawn(move || callback(connection.send(request)))
            .map_err(Error::Spawn)?;
        Ok(Dispatched { handle })
    }

    /// Resolve `name`, check its preconditions and bind the arguments.
    pub fn prepare(&self, name: &str, args: Args) -> Result<Call, Error> {
        let default = name.parse::<Operation>().ok();
        if let Some(op) = default {
            if !self.supports(op) {
                return Err(Error::UnsupportedOperation {
                    resource: self.name.clone(),
                    operation: name.to_string(),
                });
            }
        }

        let template = self
            .requests
            .get(name)
            .ok_or_else(|| Error::UnknownOperation {
                resource: self.name.clone(),
                operation: name.to_string(),
            })?;
        let needs_id = default.map_or_else(|| template.requires_id(), |op| op.requires_id());
        let needs_payload = default.is_some_and(|op| op.requires_payload());

        let mut call = Call::new(self.name.as_str(), template.clone());
        match args.present_id() {
            Some(id) => call = call.with_id(id.clone())?,
            None if needs_id => return Err(self.missing(name, Argument::Id)),
            None => {}
        }
        match args.present_payload() {
            Some(payload) => call = call.with_payload(payload.clone())?,
            None if needs_payload => return Err(self.missing(name, Argument::Payload)),
            None => {}
        }

        debug!(
            resource = %self.name,
            operation = name,
            method = %call.method(),
            id = ?call.id(),
            "prepared call"
        );
        Ok(call)
    }

    fn missing(&self, operation: &str, argument: Argument) -> Error {
        Error::MissingArgument {
            resource: self.name.clone(),
            operation: operation.to_string(),
            argument,
        }
    }
}

/// Handle on a call running on a worker thread.
#[derive(Debug)]
pub struct Dispatched {
    handle: JoinHandle<()>,
}

impl Dispatched {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the exchange and its callback to finish. Fails only if the
    /// callback panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}
