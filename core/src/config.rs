//! Client options and declarative client configuration.
//!
//! `ClientOptions` carries the recognised connection keys. `ClientConfig`
//! adds the host, extra headers and resource registrations so a whole client
//! can be described in one JSON document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::Error;
use crate::http::HttpMethod;
use crate::request::{Operation, RequestTemplate};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

pub fn default_user_agent() -> String {
    format!("resty/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Connection options. Every key is optional.
///
/// `content_type` and `user_agent` accept a string or `false`; `false`
/// removes the default header entirely. `null` keeps the default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    pub scheme: Scheme,
    pub port: Option<u16>,
    #[serde(deserialize_with = "version_segment")]
    pub version: Option<String>,
    pub cert: Option<PathBuf>,
    #[serde(deserialize_with = "content_type_or_false")]
    pub content_type: Option<String>,
    #[serde(deserialize_with = "user_agent_or_false")]
    pub user_agent: Option<String>,
    pub insecure: bool,
    pub timeout_ms: Option<u64>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            scheme: Scheme::Https,
            port: None,
            version: None,
            cert: None,
            content_type: Some(DEFAULT_CONTENT_TYPE.to_string()),
            user_agent: Some(default_user_agent()),
            insecure: false,
            timeout_ms: None,
        }
    }
}

impl ClientOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The version path segment: `2` becomes `v2`, anything else is kept.
    pub fn version_segment(&self) -> Option<String> {
        let version = self.version.as_deref()?.trim_matches('/');
        if version.is_empty() {
            return None;
        }
        if version.chars().all(|c| c.is_ascii_digit() || c == '.') {
            Some(format!("v{version}"))
        } else {
            Some(version.to_string())
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrBool {
    Str(String),
    Bool(bool),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(u64),
}

fn header_or_false<'de, D>(deserializer: D, default: String) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrBool>::deserialize(deserializer)? {
        None => Ok(Some(default)),
        Some(StringOrBool::Str(value)) => Ok(Some(value)),
        Some(StringOrBool::Bool(false)) => Ok(None),
        Some(StringOrBool::Bool(true)) => Err(serde::de::Error::custom(
            "expected a header value or `false`",
        )),
    }
}

fn content_type_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    header_or_false(deserializer, DEFAULT_CONTENT_TYPE.to_string())
}

fn user_agent_or_false<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    header_or_false(deserializer, default_user_agent())
}

fn version_segment<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Num(n) => n.to_string(),
    }))
}

/// A custom operation as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MethodDef {
    pub name: String,
    /// Path template relative to the resource, e.g. `{id}/formatted_address`.
    #[serde(default)]
    pub method: String,
    pub http_method: HttpMethod,
}

impl From<MethodDef> for RequestTemplate {
    fn from(def: MethodDef) -> Self {
        RequestTemplate::new(def.name, def.http_method, def.method)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub operations: Vec<Operation>,
    pub methods: Vec<MethodDef>,
}

/// A complete client description.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub host: String,
    #[serde(default)]
    pub options: ClientOptions,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ClientConfig {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }
}
