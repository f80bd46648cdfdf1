use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::errors::ApiError;
use super::types::{
    EgoStateResponse, InteractionResponse, MetricsResponse, ResetEgoRequest, ResetEgoResponse,
    StartRequest, WorkflowTicket,
};
use crate::config::ApiConfig;
use crate::session::WorkflowApi;

const METRICS_KEY: &str = "metrics";
const EGO_STATE_KEY: &str = "ego/state";

/// Rate-limited client for the Athena HTTP API with a short-lived response cache
#[derive(Debug)]
pub struct AthenaClient {
    http: Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    cache: Cache<String, serde_json::Value>,
}

impl AthenaClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
            .build();

        Ok(Self {
            http,
            base_url,
            rate_limiter,
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a streamed workflow; progress arrives on the workflow channel.
    pub async fn start_workflow(&self, request: &StartRequest) -> Result<WorkflowTicket, ApiError> {
        self.execute(Method::POST, "chat/stream", Some(request)).await
    }

    /// Run a full interaction synchronously.
    pub async fn send_message(&self, request: &StartRequest) -> Result<InteractionResponse, ApiError> {
        self.execute(Method::POST, "chat", Some(request)).await
    }

    pub async fn metrics(&self) -> Result<MetricsResponse, ApiError> {
        self.cached(METRICS_KEY).await
    }

    pub async fn research_metrics(&self) -> Result<serde_json::Value, ApiError> {
        self.execute::<(), _>(Method::GET, "metrics/research", None).await
    }

    pub async fn ego_state(&self) -> Result<EgoStateResponse, ApiError> {
        self.cached(EGO_STATE_KEY).await
    }

    /// Reset the ego model; cached ego and metrics views are dropped.
    pub async fn reset_ego(&self, initial_strength: Option<f64>) -> Result<ResetEgoResponse, ApiError> {
        let body = ResetEgoRequest { initial_strength };
        let response = self.execute(Method::POST, "ego/reset", Some(&body)).await?;
        self.invalidate_cache_pattern("ego").await;
        self.cache.invalidate(METRICS_KEY).await;
        Ok(response)
    }

    /// Clear cache (useful for testing or after write operations)
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all();
        info!("API client cache cleared");
    }

    /// Invalidate cache entries whose key contains `pattern`
    pub async fn invalidate_cache_pattern(&self, pattern: &str) {
        let keys_to_remove: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        for key in keys_to_remove {
            self.cache.invalidate(&key).await;
        }

        debug!("Invalidated cache entries matching pattern: {}", pattern);
    }

    async fn cached<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        if let Some(cached) = self.cache.get(path).await {
            debug!("Cache hit for key: {}", path);
            if let Ok(value) = serde_json::from_value(cached) {
                return Ok(value);
            }
        }

        let raw: serde_json::Value = self.execute::<(), _>(Method::GET, path, None).await?;
        let value = serde_json::from_value(raw.clone())?;
        self.cache.insert(path.to_string(), raw).await;
        Ok(value)
    }

    async fn execute<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let url = format!("{}/{}", self.base_url, path);
        debug!(%method, %url, "Executing Athena API request");

        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl WorkflowApi for AthenaClient {
    async fn start_workflow(&self, request: &StartRequest) -> Result<WorkflowTicket, ApiError> {
        AthenaClient::start_workflow(self, request).await
    }
}
