use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    executors::{ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch},
    flow::{
        NodeKind, NodeType,
        config::{ApiKeyType, AuthorizationType, ContentType, HttpConfig},
    },
};

const STATUS_CODE_KEY: &str = "status_code";
const BODY_KEY: &str = "body";
const HEADERS_KEY: &str = "headers";

fn invalid(message: impl ToString) -> NodeFailure {
    NodeFailure::InvalidInput(message.to_string())
}

/// Failure for an error status.
///
/// Client errors are permanent except 408 and 429; server errors may be
/// retried.
fn status_failure(status: reqwest::StatusCode) -> NodeFailure {
    let retryable = status.is_server_error() || matches!(status.as_u16(), 408 | 429);
    NodeFailure::Provider {
        message: format!("http request returned {}", status),
        retryable,
    }
}

/// Runs `http` nodes with a shared `reqwest` client.
///
/// Output: `{ "status_code", "headers", "body" }`; a JSON response body is
/// parsed, anything else is kept as text. Status 400 and above fails the node.
#[derive(Debug, Clone, Default)]
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
        }
    }

    fn apply_auth_headers(
        &self,
        config: &HttpConfig,
        headers: &mut HeaderMap,
    ) -> Result<(), NodeFailure> {
        let AuthorizationType::ApiKey(api_key_type) = config.auth.auth_type else {
            return Ok(());
        };
        let api_key = config.auth.api_key.as_ref().ok_or_else(|| invalid("api_key is required for api-key authorization"))?;

        let header_name = config.auth.header.as_deref().unwrap_or("Authorization");
        let header_key: HeaderName = header_name.parse().map_err(invalid)?;

        let header_value = match api_key_type {
            ApiKeyType::Bearer => format!("Bearer {}", api_key),
            ApiKeyType::Basic => {
                // `user:password` is encoded, an already encoded key is sent as is
                let encoded = if api_key.contains(':') { STANDARD.encode(api_key.as_bytes()) } else { api_key.clone() };
                format!("Basic {}", encoded)
            }
            ApiKeyType::Custom => api_key.clone(),
        };

        headers.insert(header_key, header_value.parse::<HeaderValue>().map_err(invalid)?);
        Ok(())
    }

    fn build_request(
        &self,
        input: &ExecutorInput,
        config: &HttpConfig,
    ) -> Result<reqwest::RequestBuilder, NodeFailure> {
        let url = input.resolve(&config.url)?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("accept"), HeaderValue::from_static("*/*"));
        self.apply_auth_headers(config, &mut headers)?;

        for (key, value) in &config.headers {
            let value = input.resolve(value)?;
            headers.insert(key.parse::<HeaderName>().map_err(invalid)?, value.parse::<HeaderValue>().map_err(invalid)?);
        }

        let query = config.params.iter().map(|(key, value)| input.resolve(value).map(|v| (key.clone(), v))).collect::<Result<Vec<_>, _>>()?;

        let method: reqwest::Method = config.method.as_ref().parse().map_err(invalid)?;
        let mut request = self.client.request(method, &url).headers(headers).query(&query);

        let mismatch = || invalid("content-type did not match the body content");
        if let Some(data) = &config.body.data {
            match config.body.content_type {
                ContentType::None => {}
                ContentType::Text | ContentType::Html => {
                    let text = data.as_str().ok_or_else(mismatch)?;
                    request = request.body(input.resolve(text)?);
                }
                ContentType::Json => {
                    let body = serde_json::to_vec(&input.resolve_json(data)?).map_err(invalid)?;
                    request = request.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
                }
                ContentType::FormData | ContentType::UrlEncoded => {
                    let form = input.resolve_json(data)?;
                    let fields = form.as_object().ok_or_else(mismatch)?;
                    let fields: Vec<(String, String)> = fields
                        .iter()
                        .map(|(k, v)| {
                            let v = match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (k.clone(), v)
                        })
                        .collect();
                    request = request.form(&fields);
                }
                ContentType::Binary => {
                    let encoded = data.as_str().ok_or_else(mismatch)?;
                    request = request.body(STANDARD.decode(encoded).map_err(invalid)?);
                }
            }
        }

        Ok(request.timeout(Duration::from_millis(config.timeout)))
    }
}

#[async_trait]
impl NodeExecutor for HttpExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Http
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Http(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Http, &input.node));
        };

        let request = self.build_request(&input, config)?;
        let res = request.send().await.map_err(|err| {
            if err.is_timeout() {
                NodeFailure::Timeout(config.timeout)
            } else if err.is_builder() {
                invalid(err)
            } else {
                NodeFailure::Provider {
                    message: format!("http error: {}", err),
                    retryable: true,
                }
            }
        })?;

        let status = res.status();
        debug!("http node '{}' answered {}", input.node.id, status);

        let headers: HashMap<String, String> = res.headers().iter().map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string())).collect();
        let text = res.text().await.map_err(|err| NodeFailure::Failed(err.to_string()))?;

        if status.as_u16() >= 400 {
            return Err(status_failure(status));
        }

        let mut outputs = serde_json::Map::new();
        outputs.insert(STATUS_CODE_KEY.to_string(), status.as_u16().into());
        outputs.insert(HEADERS_KEY.to_string(), json!(headers));
        outputs.insert(BODY_KEY.to_string(), serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text)));

        Ok(ExecutorOutput::new(Value::Object(outputs)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{executors::test_util::input, flow::FlowNode};

    #[test]
    fn test_basic_auth_is_encoded() {
        let mut config = HttpConfig::default();
        config.auth.auth_type = AuthorizationType::ApiKey(ApiKeyType::Basic);
        config.auth.api_key = Some("user:pass".to_string());

        let mut headers = HeaderMap::new();
        HttpExecutor::new().apply_auth_headers(&config, &mut headers).unwrap();

        assert_eq!(headers["authorization"], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_custom_header_auth() {
        let mut config = HttpConfig::default();
        config.auth.auth_type = AuthorizationType::ApiKey(ApiKeyType::Custom);
        config.auth.api_key = Some("k-123".to_string());
        config.auth.header = Some("X-Api-Key".to_string());

        let mut headers = HeaderMap::new();
        HttpExecutor::new().apply_auth_headers(&config, &mut headers).unwrap();

        assert_eq!(headers["x-api-key"], "k-123");
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = HttpConfig::default();
        config.auth.auth_type = AuthorizationType::ApiKey(ApiKeyType::Bearer);

        let err = HttpExecutor::new().apply_auth_headers(&config, &mut HeaderMap::new()).unwrap_err();
        assert!(matches!(err, NodeFailure::InvalidInput(_)));
    }

    #[test]
    fn test_status_classification() {
        for (code, retryable) in [(400, false), (401, false), (404, false), (408, true), (429, true), (500, true), (503, true)] {
            let failure = status_failure(reqwest::StatusCode::from_u16(code).unwrap());
            assert_eq!(failure.is_retryable(), retryable, "status {}", code);
        }
    }

    #[tokio::test]
    async fn test_body_type_mismatch() {
        let mut config = HttpConfig::default();
        config.url = "http://localhost:1/hook".to_string();
        config.body.content_type = ContentType::Text;
        config.body.data = Some(json!({ "not": "text" }));

        let err = HttpExecutor::new().execute(input(FlowNode::new("call", NodeKind::Http(config)))).await.unwrap_err();
        assert!(err.to_string().contains("content-type did not match"));
    }
}
