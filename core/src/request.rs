//! Request templates and the call-scoped values built from them.
//!
//! # Design
//! A `RequestTemplate` is the fixed (name, method, path) triple registered on
//! a resource and never changes afterwards. Each invocation clones it into a
//! `Call` together with that invocation's id and payload, so concurrent calls
//! on the same operation never observe each other's arguments.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Argument, Error};
use crate::http::HttpMethod;

/// Placeholder substituted with the call's id.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Request payload. `Value::Null` counts as absent.
pub type Payload = Value;

/// One of the five built-in operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    pub fn http_method(&self) -> HttpMethod {
        match self {
            Operation::List | Operation::Get => HttpMethod::Get,
            Operation::Create => HttpMethod::Post,
            Operation::Update => HttpMethod::Patch,
            Operation::Delete => HttpMethod::Delete,
        }
    }

    pub fn path_template(&self) -> &'static str {
        if self.requires_id() {
            ID_PLACEHOLDER
        } else {
            ""
        }
    }

    pub fn requires_id(&self) -> bool {
        matches!(self, Operation::Get | Operation::Update | Operation::Delete)
    }

    pub fn requires_payload(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::Config(format!("unknown default operation `{s}`")))
    }
}

impl TryFrom<String> for Operation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Identifier substituted into `{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Id {
    Str(String),
    Int(i64),
}

impl Id {
    pub fn is_empty(&self) -> bool {
        matches!(self, Id::Str(s) if s.is_empty())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Str(s) => f.write_str(s),
            Id::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Str(value.to_string())
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::Str(value)
    }
}

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Id::Int(value.into())
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Int(value)
    }
}

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Id::Int(value.into())
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Id::Int)
            .unwrap_or_else(|_| Id::Str(value.to_string()))
    }
}

/// Encode an id as one path segment. `.` and `..` are escaped too, since
/// they are left alone by percent-encoding but resolve as dot-segments.
fn encode_id(id: &Id) -> String {
    let raw = id.to_string();
    match raw.as_str() {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => urlencoding::encode(&raw).into_owned(),
    }
}

/// The fixed verb and path registered for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    name: String,
    method: HttpMethod,
    path: String,
}

impl RequestTemplate {
    /// Template for a custom operation.
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
        }
    }

    /// Template for a default operation, using its conventional verb and path.
    pub fn from_operation(operation: Operation) -> Self {
        Self::new(operation.as_str(), operation.http_method(), operation.path_template())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn requires_id(&self) -> bool {
        self.path.contains(ID_PLACEHOLDER)
    }
}

/// Per-call arguments for `Resource::invoke` and `Resource::dispatch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub id: Option<Id>,
    pub payload: Option<Payload>,
}

impl Args {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn id(id: impl Into<Id>) -> Self {
        Self {
            id: Some(id.into()),
            payload: None,
        }
    }

    pub fn payload(payload: Payload) -> Self {
        Self {
            id: None,
            payload: Some(payload),
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// The id, if present and non-empty.
    pub(crate) fn present_id(&self) -> Option<&Id> {
        self.id.as_ref().filter(|id| !id.is_empty())
    }

    /// The payload, if present and not `null`.
    pub(crate) fn present_payload(&self) -> Option<&Payload> {
        self.payload.as_ref().filter(|payload| !payload.is_null())
    }
}

/// A template bound to one invocation's id and payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    resource: String,
    template: RequestTemplate,
    id: Option<Id>,
    payload: Option<Payload>,
}

impl Call {
    pub fn new(resource: impl Into<String>, template: RequestTemplate) -> Self {
        Self {
            resource: resource.into(),
            template,
            id: None,
            payload: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() {
            return Err(self.missing(Argument::Id));
        }
        self.id = Some(id);
        Ok(self)
    }

    pub fn with_payload(mut self, payload: Payload) -> Result<Self, Error> {
        if payload.is_null() {
            return Err(self.missing(Argument::Payload));
        }
        self.payload = Some(payload);
        Ok(self)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }

    pub fn method(&self) -> HttpMethod {
        self.template.method()
    }

    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Path relative to the resource, with `{id}` substituted.
    ///
    /// Empty template segments are dropped before substitution; the id is
    /// percent-encoded as a single segment, so it can never add a query,
    /// extra segments or a dot-segment. Without an id the placeholder is
    /// removed, so `{id}` alone resolves to an empty path.
    pub fn path(&self) -> String {
        let id = self.id.as_ref().map(encode_id).unwrap_or_default();
        self.template
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace(ID_PLACEHOLDER, &id))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn missing(&self, argument: Argument) -> Error {
        Error::MissingArgument {
            resource: self.resource.clone(),
            operation: self.template.name().to_string(),
            argument,
        }
    }
}
