//! ==============================================================================
//! fetch.rs - remote forecast fetch pipeline
//! ==============================================================================
//!
//! purpose:
//!     one fetch attempt against the OpenWeather One Call endpoint:
//!
//!         gated?      -> Backoff      (no request, no state change)
//!         link down?  -> NoLink       (no request, no state change)
//!         request     -> Transport    (backoff.on_failure)
//!                     -> BadStatus    (backoff.on_failure)
//!                     -> body         (backoff.on_success)
//!
//!     exactly one backoff transition per attempt that reaches the network.
//!     "success" means the service answered 200; whether the body is usable
//!     is forecast.rs's business.
//!
//! relationships:
//!     - used by: scheduler.rs (fetch step)
//!     - mutates: backoff.rs (passed in by the scheduler)
//!     - uses: reqwest (HttpTransport)
//!
//! ==============================================================================

use std::time::Duration;

use anyhow::Result;
use thiserror::Error;

use crate::backoff::BackoffController;
use crate::config::ForecastConfig;
use crate::domain::RawPayload;
use crate::link::Link;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch blocked by backoff until {until}")]
    Backoff { until: u64 },
    #[error("no network link")]
    NoLink,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// request/response seam; `Err` means no response at all
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

pub struct RemoteFetcher<T> {
    transport: T,
    endpoint: String,
    /// endpoint with the access key masked, for logs
    display_endpoint: String,
}

impl<T: Transport> RemoteFetcher<T> {
    pub fn new(transport: T, config: &ForecastConfig) -> Self {
        Self {
            transport,
            endpoint: endpoint_url(config, &config.api_key),
            display_endpoint: endpoint_url(config, "***"),
        }
    }

    pub async fn fetch(
        &self,
        backoff: &mut BackoffController,
        link: &dyn Link,
        now: u64,
    ) -> Result<RawPayload, FetchError> {
        if backoff.is_gated(now) {
            let until = backoff.state().next_allowed_at;
            tracing::debug!("fetch blocked by backoff for another {}s", until - now);
            return Err(FetchError::Backoff { until });
        }

        if !link.is_up() {
            return Err(FetchError::NoLink);
        }

        tracing::info!("requesting {}", self.display_endpoint);
        let error = match self.transport.get(&self.endpoint).await {
            Ok(response) if response.status == 200 => {
                backoff.on_success();
                return Ok(RawPayload::from(response.body));
            }
            Ok(response) => FetchError::BadStatus(response.status),
            Err(e) => FetchError::Transport(format!("{:#}", e)),
        };

        let delay = backoff.on_failure(now);
        tracing::warn!(
            "{} (failure {}, next attempt in {}s)",
            error,
            backoff.state().failure_count,
            delay
        );
        Err(error)
    }
}

pub fn endpoint_url(config: &ForecastConfig, api_key: &str) -> String {
    format!(
        "{}?lat={:.6}&lon={:.6}&units=metric&exclude=minutely&appid={}",
        config.base_url, config.lat, config.lon, api_key
    )
}
