//! HTTP data service

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, error};
use unsaidtalks_core::{
    ApiConfig, DashboardError, DashboardResult, DataService, ErrorContext, WriteMethod,
};
use url::Url;

const API_KEY_HEADER: &str = "x-api-key";

/// JSON-over-HTTP implementation of [`DataService`]
#[derive(Debug, Clone)]
pub struct HttpDataService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDataService {
    pub fn new(config: &ApiConfig) -> DashboardResult<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| DashboardError::Config {
            message: format!("Invalid API base URL '{}': {}", config.base_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_data_service").with_operation("new"),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let api_key = HeaderValue::from_str(&config.api_key).map_err(|e| DashboardError::Config {
            message: format!("Invalid API key header value: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_data_service")
                .with_operation("new")
                .with_suggestion("Check api.api_key or UNSAIDTALKS_API_KEY"),
        })?;
        headers.insert(API_KEY_HEADER, api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| DashboardError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                status: None,
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_data_service").with_operation("new"),
            })?;

        debug!(base_url = %base, "Created HTTP data service");
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for an endpoint such as `/api/sessions/upcoming`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn request(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> DashboardResult<Value> {
        let url = self.endpoint_url(endpoint);
        debug!(%method, %url, "Sending request");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            error!(endpoint, error = %e, "API request failed");
            DashboardError::Network {
                message: format!("Request to {} failed: {}", endpoint, e),
                status: None,
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_data_service")
                    .with_operation(method.as_str())
                    .with_suggestion("Check api.base_url and network connectivity"),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(endpoint, status = status.as_u16(), "API request rejected");
            return Err(DashboardError::Fetch {
                message: format!(
                    "API Error: {} - {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
                source: None,
                context: ErrorContext::new("http_data_service")
                    .with_operation(method.as_str())
                    .with_metadata("endpoint", endpoint)
                    .with_metadata("status", &status.as_u16().to_string()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DashboardError::Network {
            message: format!("Failed to read response from {}: {}", endpoint, e),
            status: Some(status.as_u16()),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_data_service").with_operation("read_body"),
        })?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn get(&self, endpoint: &str) -> DashboardResult<Value> {
        self.request(reqwest::Method::GET, endpoint, None).await
    }

    async fn send(
        &self,
        method: WriteMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> DashboardResult<Value> {
        let method = match method {
            WriteMethod::Post => reqwest::Method::POST,
            WriteMethod::Put => reqwest::Method::PUT,
            WriteMethod::Patch => reqwest::Method::PATCH,
            WriteMethod::Delete => reqwest::Method::DELETE,
        };
        self.request(method, endpoint, body).await
    }
}
