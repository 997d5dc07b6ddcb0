//! Configuration schema definitions.
//!
//! This module defines the on-disk shape of a mock configuration document.
//! All types derive Serde traits for deserialization from the JSON config file;
//! field names follow the camelCase keys the file uses.

use std::fmt;
use std::path::PathBuf;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of a configuration document.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Projects with their endpoints embedded inline.
    pub projects: Vec<ProjectConfig>,

    /// Other config files whose projects are appended to this document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imported_configurations: Vec<ImportedConfiguration>,

    /// Listener ports.
    pub result: ServerSettings,
}

/// Reference to an imported configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportedConfiguration {
    /// Path of the imported file. Relative paths resolve against the importing file.
    pub path: PathBuf,
}

/// Ports the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub http_port: u16,

    /// Parsed for compatibility; HTTPS is not served.
    pub https_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 3000,
            https_port: 3001,
        }
    }
}

/// A project groups endpoints under one public path segment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub uuid: String,

    pub name: String,

    /// Public path segment; `name` is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    /// Origin that unmatched requests are forwarded to.
    #[serde(
        default,
        alias = "fallbackUrlPrefix",
        skip_serializing_if = "Option::is_none"
    )]
    pub url_prefix: Option<String>,

    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// One mocked endpoint as declared in the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    #[serde(default)]
    pub uuid: String,

    /// Path below the project segment, e.g. `/users`.
    pub path: String,

    pub method: HttpMethod,

    #[serde(default)]
    pub request: RequestConfig,

    #[serde(default)]
    pub response: ResponseBody,

    #[serde(default = "default_status_code")]
    pub status_code: u16,

    /// Response delay in milliseconds.
    #[serde(default)]
    pub timeout: u64,

    /// A missing flag counts as disabled.
    #[serde(default)]
    pub enable: bool,
}

fn default_status_code() -> u16 {
    200
}

/// The request shape an endpoint answers to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Raw query string, with or without the leading `?`.
    pub params: String,

    /// Expected request body; `null`, `""` and `{}` mean "no body".
    pub body: Value,
}

/// HTTP verbs an endpoint can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn to_http(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a verb outside the supported set.
#[derive(Debug, thiserror::Error)]
#[error("unsupported endpoint method {0:?}")]
pub struct UnsupportedMethod(pub String);

impl TryFrom<String> for HttpMethod {
    type Error = UnsupportedMethod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(UnsupportedMethod(value)),
        }
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Canned response body, decided at load time from the declared JSON shape.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Value", into = "Value")]
pub enum ResponseBody {
    /// Any non-string JSON value, served as `application/json`.
    Json(Value),
    /// A JSON string, served verbatim as text.
    Text(String),
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::Json(Value::Null)
    }
}

impl From<Value> for ResponseBody {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ResponseBody::Text(text),
            other => ResponseBody::Json(other),
        }
    }
}

impl From<ResponseBody> for Value {
    fn from(body: ResponseBody) -> Self {
        match body {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}
