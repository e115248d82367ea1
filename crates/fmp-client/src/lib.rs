//! Client for the Financial Modeling Prep statements API.
//!
//! One ticker costs eight requests: every fiscal quarter crossed with the
//! income-statement and balance-sheet sections. Each request degrades to an
//! error-shaped entry on failure so a batch never aborts on a single ticker.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use peers_core::{sanitize_json, PeersError};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod transform;

pub use transform::transform_statements;

const BASE_URL: &str = "https://financialmodelingprep.com/stable";

const FISCAL_QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];
const STATEMENT_SECTIONS: [&str; 2] = ["income-statement", "balance-sheet-statement"];

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for FMP API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Configuration frozen at construction time.
#[derive(Debug, Clone)]
pub struct FmpConfig {
    pub api_key: String,
    pub base_url: String,
    /// Requests per minute. Free tier users should set FMP_RATE_LIMIT=10.
    pub rate_limit: usize,
    pub timeout: Duration,
}

impl FmpConfig {
    /// Read configuration from the environment. A missing API key is not an
    /// error here; it surfaces per-call as an error-shaped payload.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FMP_API_KEY").unwrap_or_default(),
            base_url: std::env::var("FMP_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string()),
            rate_limit: std::env::var("FMP_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct FmpClient {
    config: FmpConfig,
    client: Client,
    rate_limiter: RateLimiter,
}

impl FmpClient {
    pub fn new(config: FmpConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let rate_limiter = RateLimiter::new(config.rate_limit, Duration::from_secs(60));

        Self {
            config,
            client,
            rate_limiter,
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PeersError> {
        let request = builder
            .build()
            .map_err(|e| PeersError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| PeersError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| PeersError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "FMP 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(PeersError::ApiError(
            "Rate limited by FMP after 3 retries".to_string(),
        ))
    }

    async fn fetch_section(
        &self,
        ticker: &str,
        quarter: &str,
        section: &str,
    ) -> Result<Value, PeersError> {
        let url = format!("{}/{}", self.config.base_url, section);

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("symbol", ticker),
                ("period", quarter),
                ("apikey", self.config.api_key.as_str()),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(PeersError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PeersError::ApiError(e.to_string()))
    }

    /// Fetch every statement entry for a ticker: 4 fiscal quarters x 2
    /// statement sections, flattened into one sanitized list. A failed call
    /// contributes an `{"error", "source"}` entry instead of propagating.
    pub async fn fetch_statements(&self, ticker: &str) -> Vec<Value> {
        let mut all_data = Vec::new();

        for quarter in FISCAL_QUARTERS {
            for section in STATEMENT_SECTIONS {
                match self.fetch_section(ticker, quarter, section).await {
                    Ok(Value::Array(items)) => all_data.extend(items),
                    Ok(other) => all_data.push(other),
                    Err(e) => {
                        tracing::warn!("FMP {} {} failed for {}: {}", section, quarter, ticker, e);
                        all_data.push(json!({"error": e.to_string(), "source": section}));
                    }
                }
            }
        }

        all_data.into_iter().map(sanitize_json).collect()
    }
}

/// Fetch seam for the statements pipeline, so the aggregator can run against
/// an in-memory source in tests.
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn fetch_statements(&self, ticker: &str) -> Vec<Value>;
}

#[async_trait]
impl StatementSource for FmpClient {
    async fn fetch_statements(&self, ticker: &str) -> Vec<Value> {
        FmpClient::fetch_statements(self, ticker).await
    }
}
