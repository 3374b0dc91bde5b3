//! Client: a connection plus the resources registered on it.
//!
//! # Design
//! `Client` is the setup-time surface: headers are added and resources and
//! custom methods registered here, usually once. Each `Resource` carries its
//! own clone of the connection, so a resource can be cloned out of the client
//! and moved into other threads without borrowing the client.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::config::{ClientConfig, ClientOptions};
use crate::connection::Connection;
use crate::error::Error;
use crate::request::{Operation, RequestTemplate};
use crate::resource::Resource;
use crate::transport::Transport;

#[derive(Debug)]
pub struct Client {
    connection: Connection,
    resources: HashMap<String, Resource>,
}

impl Client {
    pub fn new(host: &str, options: ClientOptions) -> Result<Self, Error> {
        Ok(Self::from_connection(Connection::new(host, options)?))
    }

    pub fn with_transport(
        host: &str,
        options: ClientOptions,
        transport: impl Transport + 'static,
    ) -> Self {
        Self::from_connection(Connection::with_transport(host, options, transport))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self {
            connection,
            resources: HashMap::new(),
        }
    }

    /// Build a client, its headers and its resources from a configuration document.
    pub fn from_config(config: ClientConfig) -> Result<Self, Error> {
        let connection = Connection::new(&config.host, config.options.clone())?;
        Self::from_connection(connection).apply(config)
    }

    pub fn from_config_with_transport(
        config: ClientConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self, Error> {
        let connection = Connection::with_transport(&config.host, config.options.clone(), transport);
        Self::from_connection(connection).apply(config)
    }

    fn apply(mut self, config: ClientConfig) -> Result<Self, Error> {
        for (name, value) in config.headers {
            self.add_header(name, value);
        }
        for (name, resource) in config.resources {
            self.register(&name, resource.operations);
            for method in resource.methods {
                self.register_method(&name, method)?;
            }
        }
        Ok(self)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Set a header on every subsequent request of every resource.
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.connection.add_header(name, value);
    }

    /// Register (or replace) a resource exposing the given default operations.
    pub fn register(
        &mut self,
        name: &str,
        operations: impl IntoIterator<Item = Operation>,
    ) -> &mut Resource {
        let resource = Resource::new(name, operations, self.connection.clone());
        debug!(resource = name, operations = ?resource.operation_names(), "registered resource");
        match self.resources.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(resource);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(resource),
        }
    }

    /// Register a custom operation on an already registered resource.
    pub fn register_method(
        &mut self,
        resource: &str,
        template: impl Into<RequestTemplate>,
    ) -> Result<&mut Resource, Error> {
        let entry = self
            .resources
            .get_mut(resource)
            .ok_or_else(|| Error::UnknownResource(resource.to_string()))?;
        entry.register(template.into());
        Ok(entry)
    }

    pub fn resource(&self, name: &str) -> Result<&Resource, Error> {
        self.resources
            .get(name)
            .ok_or_else(|| Error::UnknownResource(name.to_string()))
    }

    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
