//! Instana REST API client
//!
//! `InstanaApi` is the seam between tools and the remote monitoring API:
//! one method per wrapped REST operation, named after the generated-client
//! operation so tool errors can report exactly which call failed. The
//! reqwest-backed implementation builds a fresh scoped request per call;
//! the request is dropped on every exit path and only the connection pool
//! inside `reqwest::Client` is shared.

use crate::config::Credentials;
use crate::error::ApiError;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Query parameters for the GET-style Instana endpoints
pub type QueryParams = Vec<(&'static str, String)>;

/// Instana REST operations used by the tools
#[async_trait]
pub trait InstanaApi: Send + Sync {
    /// POST /api/application-monitoring/v2/metrics
    async fn get_application_data_metrics_v2(&self, body: Value) -> Result<Value, ApiError>;

    /// POST /api/application-monitoring/v2/metrics/services
    async fn get_application_service_data_metrics(&self, body: Value) -> Result<Value, ApiError>;

    /// POST /api/application-monitoring/v2/metrics/endpoints
    async fn get_application_endpoint_data_metrics(&self, body: Value) -> Result<Value, ApiError>;

    /// POST /api/website-monitoring/v2/metrics
    async fn get_website_beacon_metrics_v2(&self, body: Value) -> Result<Value, ApiError>;

    /// GET /api/application-monitoring/applications
    async fn get_applications(&self, query: QueryParams) -> Result<Value, ApiError>;

    /// GET /api/events
    async fn get_events(&self, query: QueryParams) -> Result<Value, ApiError>;

    /// POST /api/infrastructure-monitoring/metrics
    async fn get_infrastructure_metrics(&self, body: Value) -> Result<Value, ApiError>;

    /// GET /api/infrastructure-monitoring/snapshots
    async fn get_agent_snapshots(&self, query: QueryParams) -> Result<Value, ApiError>;
}

/// Default timeout for Instana API calls. This layer enforces nothing
/// beyond the HTTP client's own timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed `InstanaApi` implementation
pub struct InstanaApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl InstanaApiClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            api_token: credentials.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        let response = self
            .http
            .post(self.url(path))
            .header("authorization", format!("apiToken {}", self.api_token))
            .json(body)
            .send()
            .await?;

        Self::read_body(response).await
    }

    async fn get_json(&self, path: &str, query: &QueryParams) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url(path))
            .header("authorization", format!("apiToken {}", self.api_token))
            .query(query)
            .send()
            .await?;

        Self::read_body(response).await
    }

    async fn read_body(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(ApiError::from)
    }
}

#[async_trait]
impl InstanaApi for InstanaApiClient {
    async fn get_application_data_metrics_v2(&self, body: Value) -> Result<Value, ApiError> {
        self.post_json("/api/application-monitoring/v2/metrics", &body)
            .await
    }

    async fn get_application_service_data_metrics(&self, body: Value) -> Result<Value, ApiError> {
        self.post_json("/api/application-monitoring/v2/metrics/services", &body)
            .await
    }

    async fn get_application_endpoint_data_metrics(&self, body: Value) -> Result<Value, ApiError> {
        self.post_json("/api/application-monitoring/v2/metrics/endpoints", &body)
            .await
    }

    async fn get_website_beacon_metrics_v2(&self, body: Value) -> Result<Value, ApiError> {
        self.post_json("/api/website-monitoring/v2/metrics", &body)
            .await
    }

    async fn get_applications(&self, query: QueryParams) -> Result<Value, ApiError> {
        self.get_json("/api/application-monitoring/applications", &query)
            .await
    }

    async fn get_events(&self, query: QueryParams) -> Result<Value, ApiError> {
        self.get_json("/api/events", &query).await
    }

    async fn get_infrastructure_metrics(&self, body: Value) -> Result<Value, ApiError> {
        self.post_json("/api/infrastructure-monitoring/metrics", &body)
            .await
    }

    async fn get_agent_snapshots(&self, query: QueryParams) -> Result<Value, ApiError> {
        self.get_json("/api/infrastructure-monitoring/snapshots", &query)
            .await
    }
}
