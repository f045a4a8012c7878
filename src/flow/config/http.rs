//! Configuration of `http` nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default request timeout in milliseconds.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationType {
    #[default]
    NoAuth,
    ApiKey(ApiKeyType),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyType {
    Basic,
    Bearer,
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr)]
pub enum HttpRequestMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
    HEAD,
    OPTIONS,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    None,
    Text,
    Html,
    Json,
    #[serde(rename = "urlencoded")]
    UrlEncoded,
    #[serde(rename = "form-data")]
    FormData,
    Binary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    pub auth_type: AuthorizationType,
    pub api_key: Option<String>,
    /// header carrying the key, `Authorization` when unset
    pub header: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBody {
    pub content_type: ContentType,
    pub data: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub url: String,
    pub method: HttpRequestMethod,
    pub auth: AuthorizationConfig,
    pub headers: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub body: HttpBody,
    /// request timeout in milliseconds
    pub timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpRequestMethod::default(),
            auth: AuthorizationConfig::default(),
            headers: HashMap::new(),
            params: HashMap::new(),
            body: HttpBody::default(),
            timeout: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}
