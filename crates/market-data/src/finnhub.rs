//! Finnhub reported-financials adapter.
//!
//! One fetch per frequency (quarterly, annual). Every report carries three
//! statement sections (`ic`, `bs`, `cf`) whose line items are filtered down
//! to a fixed per-section allow-list before anything leaves the adapter.

use async_trait::async_trait;
use peers_core::PeersError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_URL: &str = "https://finnhub.io/api/v1";

const FREQUENCIES: [&str; 2] = ["quarterly", "annual"];

/// Line-item labels permitted through each statement section.
#[derive(Debug, Clone)]
pub struct FinnhubAllowList {
    pub ic: Vec<&'static str>,
    pub bs: Vec<&'static str>,
    pub cf: Vec<&'static str>,
}

impl Default for FinnhubAllowList {
    fn default() -> Self {
        Self {
            bs: vec![
                "Cash and cash equivalents",
                "Investments",
                "Total assets",
                "Accounts payable",
                "Total current liabilities",
                "Borrowings",
                "Total equity",
                "Total liabilities and equity",
            ],
            cf: vec!["Net income"],
            ic: vec![
                "Revenues",
                "Total Revenues",
                "Operating expenses",
                "Interest income (expense), net",
                "Net income",
                "Basic (in dollars per share)",
                "Diluted (in dollars per share)",
            ],
        }
    }
}

impl FinnhubAllowList {
    fn filter_section(items: &mut Vec<LineItem>, allowed: &[&'static str]) {
        items.retain(|item| {
            item.label
                .as_deref()
                .is_some_and(|label| allowed.contains(&label))
        });
    }

    pub fn filter_report(&self, report: &mut StatementReport) {
        Self::filter_section(&mut report.ic, &self.ic);
        Self::filter_section(&mut report.bs, &self.bs);
        Self::filter_section(&mut report.cf, &self.cf);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub label: Option<String>,
    /// Finnhub occasionally reports strings here; values are coerced to f64
    /// at transform time.
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatementReport {
    #[serde(default)]
    pub ic: Vec<LineItem>,
    #[serde(default)]
    pub bs: Vec<LineItem>,
    #[serde(default)]
    pub cf: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub quarter: Option<u32>,
    #[serde(default)]
    pub report: StatementReport,
}

/// One frequency's worth of reports, or the error that replaced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FreqReports {
    #[serde(default)]
    pub data: Vec<ReportEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FreqReports {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Raw per-ticker payload, one slot per frequency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportedFinancials {
    #[serde(default)]
    pub quarterly: FreqReports,
    #[serde(default)]
    pub annual: FreqReports,
}

/// Configuration frozen at construction time.
#[derive(Debug, Clone)]
pub struct FinnhubConfig {
    pub api_key: String,
    pub base_url: String,
}

impl FinnhubConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("FINNHUB_API_KEY").unwrap_or_default(),
            base_url: std::env::var("FINNHUB_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct FinnhubClient {
    config: FinnhubConfig,
    client: reqwest::Client,
    allow_list: FinnhubAllowList,
}

impl FinnhubClient {
    pub fn new(config: FinnhubConfig) -> Self {
        Self::with_allow_list(config, FinnhubAllowList::default())
    }

    pub fn with_allow_list(config: FinnhubConfig, allow_list: FinnhubAllowList) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            allow_list,
        }
    }

    /// Fetch reported financials for both frequencies. A failed frequency
    /// carries its error in place of data; the call itself never fails.
    pub async fn fetch_reported(&self, ticker: &str) -> ReportedFinancials {
        let mut out = ReportedFinancials::default();

        for freq in FREQUENCIES {
            let reports = match self.fetch_freq(ticker, freq).await {
                Ok(reports) => reports,
                Err(e) => {
                    tracing::warn!("Finnhub {} reports failed for {}: {}", freq, ticker, e);
                    FreqReports::from_error(e.to_string())
                }
            };
            match freq {
                "quarterly" => out.quarterly = reports,
                _ => out.annual = reports,
            }
        }

        out
    }

    async fn fetch_freq(&self, ticker: &str, freq: &str) -> Result<FreqReports, PeersError> {
        let url = format!("{}/stock/financials-reported", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", ticker),
                ("freq", freq),
                ("token", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PeersError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PeersError::ApiError(
                response.text().await.unwrap_or_default(),
            ));
        }

        let mut reports: FreqReports = response
            .json()
            .await
            .map_err(|e| PeersError::ApiError(e.to_string()))?;

        for entry in &mut reports.data {
            self.allow_list.filter_report(&mut entry.report);
        }

        Ok(reports)
    }
}

/// Fetch seam for the Finnhub pipeline.
#[async_trait]
pub trait ReportedFinancialsSource: Send + Sync {
    async fn fetch_reported(&self, ticker: &str) -> ReportedFinancials;
}

#[async_trait]
impl ReportedFinancialsSource for FinnhubClient {
    async fn fetch_reported(&self, ticker: &str) -> ReportedFinancials {
        FinnhubClient::fetch_reported(self, ticker).await
    }
}
