//! HTTP transport for the platform API.
//!
//! One `reqwest::Client` per process, bearer token attached to every request,
//! status codes folded into [`ApiError`]. Idempotent requests get exactly one
//! retry after a fixed delay when the platform reports a transient failure.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use super::models::{decode_listing, Instance, InstanceEnvelope, Recipe};
use super::DevicePlatform;
use crate::types::{ApiError, Error, InstanceId, PlatformConfig, RecipeId, Result};

const USER_AGENT_VALUE: &str = concat!("genymotion-mcp/", env!("CARGO_PKG_VERSION"));

/// Whether a request may be sent twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Derive from the HTTP method (GET, HEAD, PUT, DELETE are idempotent).
    FromMethod,
    /// Safe to repeat regardless of method.
    Idempotent,
}

/// Authenticated client for the platform API.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: Url,
    request_timeout: Duration,
    retry_delay: Duration,
    retry_transient: bool,
}

impl PlatformClient {
    /// Build a client from validated configuration.
    ///
    /// An empty token is a configuration error: nothing can be called without it.
    pub fn new(config: &PlatformConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token.expose()))
            .map_err(|_| Error::configuration("API token contains invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::configuration(format!("invalid platform base URL: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            request_timeout: config.request_timeout,
            retry_delay: config.retry_delay,
            retry_transient: config.retry_transient,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Resolve path segments against the base URL.
    ///
    /// Each segment is percent-encoded as a unit, so an identifier can never
    /// add path levels, a query or a fragment.
    pub fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Parse(format!("base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Call the platform; GET-like requests are retried once on transient failure.
    pub async fn call(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> std::result::Result<Value, ApiError> {
        self.call_with(method, segments, body, Idempotency::FromMethod)
            .await
    }

    pub async fn call_with(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
        idempotency: Idempotency,
    ) -> std::result::Result<Value, ApiError> {
        let retryable = self.retry_transient
            && match idempotency {
                Idempotency::Idempotent => true,
                Idempotency::FromMethod => matches!(
                    method,
                    Method::GET | Method::HEAD | Method::PUT | Method::DELETE
                ),
            };

        let url = self.endpoint(segments)?;
        match self.send_once(method.clone(), &url, body).await {
            Err(err) if retryable && err.is_transient() => {
                tracing::warn!(
                    method = %method,
                    path = url.path(),
                    error = %err,
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "transient platform failure, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
                self.send_once(method, &url, body).await
            }
            other => other,
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ApiError> {
        tracing::debug!(method = %method, url = %url, "platform request");

        let mut request = self.http.request(method, url.clone());
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        interpret_response(status, &text)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.request_timeout)
        } else {
            ApiError::Transient {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

/// Fold a status code and body into the transport outcome.
pub(crate) fn interpret_response(
    status: StatusCode,
    body: &str,
) -> std::result::Result<Value, ApiError> {
    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(body)
            .map_err(|e| ApiError::Parse(format!("response body is not JSON: {}", e)));
    }

    let message = platform_error_message(body).unwrap_or_else(|| {
        format!(
            "platform returned {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string()
    });

    if status.is_client_error() {
        Err(ApiError::Client {
            status: status.as_u16(),
            message,
        })
    } else {
        Err(ApiError::Transient {
            status: Some(status.as_u16()),
            message,
        })
    }
}

/// Extract the human-readable message from a platform error body.
fn platform_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.get("message"),
        value.get("detail"),
        value.get("error").and_then(|e| e.get("message")),
        value.get("error"),
    ];
    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::to_string);
    message
}

fn parse_error(context: &str, err: serde_json::Error) -> ApiError {
    ApiError::Parse(format!("unexpected {} shape: {}", context, err))
}

#[async_trait]
impl DevicePlatform for PlatformClient {
    async fn list_recipes(&self) -> std::result::Result<Vec<Recipe>, ApiError> {
        let value = self.call(Method::GET, &["v1", "recipes"], None).await?;
        decode_listing(value).map_err(|e| parse_error("recipe list", e))
    }

    async fn get_recipe(&self, recipe_id: &RecipeId) -> std::result::Result<Recipe, ApiError> {
        let value = self
            .call(Method::GET, &["v1", "recipes", recipe_id.as_str()], None)
            .await?;
        serde_json::from_value(value).map_err(|e| parse_error("recipe", e))
    }

    async fn list_os_images(&self) -> std::result::Result<Vec<Value>, ApiError> {
        let value = self.call(Method::GET, &["v1", "osimages"], None).await?;
        decode_listing(value).map_err(|e| parse_error("OS image list", e))
    }

    async fn start_instance(
        &self,
        recipe_id: &RecipeId,
        instance_name: &str,
    ) -> std::result::Result<Instance, ApiError> {
        let body = serde_json::json!({ "instance_name": instance_name });
        let value = self
            .call(
                Method::POST,
                &["v1", "recipes", recipe_id.as_str(), "start-disposable"],
                Some(&body),
            )
            .await?;
        serde_json::from_value::<InstanceEnvelope>(value)
            .map(InstanceEnvelope::into_instance)
            .map_err(|e| parse_error("instance", e))
    }

    async fn stop_instance(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<Option<Instance>, ApiError> {
        let value = self
            .call_with(
                Method::POST,
                &["v1", "instances", instance_id.as_str(), "stop-disposable"],
                None,
                Idempotency::Idempotent,
            )
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value::<InstanceEnvelope>(value)
            .map(|env| Some(env.into_instance()))
            .map_err(|e| parse_error("instance", e))
    }

    async fn list_instances(&self) -> std::result::Result<Vec<Instance>, ApiError> {
        let value = self.call(Method::GET, &["v1", "instances"], None).await?;
        decode_listing(value).map_err(|e| parse_error("instance list", e))
    }

    async fn get_instance(
        &self,
        instance_id: &InstanceId,
    ) -> std::result::Result<Instance, ApiError> {
        let value = self
            .call(Method::GET, &["v1", "instances", instance_id.as_str()], None)
            .await?;
        serde_json::from_value::<InstanceEnvelope>(value)
            .map(InstanceEnvelope::into_instance)
            .map_err(|e| parse_error("instance", e))
    }
}
