//! Harvester REST transport
//!
//! Thin wrapper around `reqwest` that authenticates with a bearer token and
//! maps HTTP status codes onto [`CloudError`].

use crate::error::{HarvesterError, Result};
use harvestflow_cloud::CloudError;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const ENV_URL: &str = "HARVESTER_URL";
pub const ENV_TOKEN: &str = "HARVESTER_TOKEN";
pub const ENV_NAMESPACE: &str = "HARVESTER_NAMESPACE";

/// Upper bound on a single request, connect through body
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a Harvester cluster
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    /// Base URL, e.g. `https://harvester.example.com`
    pub url: String,
    pub token: String,
    /// Namespace used when none is given explicitly
    pub namespace: String,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub request_timeout: Duration,
}

impl HarvesterConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            namespace: "default".to_string(),
            insecure: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create HarvesterConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(ENV_URL)
            .map_err(|_| HarvesterError::MissingEnvVar(ENV_URL.to_string()))?;
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| HarvesterError::MissingEnvVar(ENV_TOKEN.to_string()))?;

        let mut config = Self::new(url, token);
        match std::env::var(ENV_NAMESPACE) {
            Ok(namespace) if !namespace.is_empty() => config.namespace = namespace,
            _ => {}
        }
        Ok(config)
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Error body returned by the Kubernetes API server
#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    message: String,
}

/// Low-level API client
pub struct HarvesterApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HarvesterApi {
    pub fn new(config: &HarvesterConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(HarvesterError::InvalidConfig("url is empty".to_string()));
        }
        if config.token.is_empty() {
            return Err(HarvesterError::InvalidConfig("token is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> std::result::Result<Value, CloudError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> std::result::Result<Value, CloudError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> std::result::Result<(), CloudError> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, CloudError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, path, &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| CloudError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

/// Map a non-success response onto the error taxonomy
fn status_error(status: StatusCode, path: &str, body: &str) -> CloudError {
    let message = serde_json::from_str::<StatusBody>(body)
        .ok()
        .map(|s| s.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::NOT_FOUND => CloudError::NotFound(path.to_string()),
        StatusCode::CONFLICT => CloudError::AlreadyExists(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CloudError::AuthenticationFailed(message)
        }
        _ => CloudError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
