//! Yahoo Finance fundamentals-timeseries adapter.
//!
//! Pulls four pre-aggregated tabular views per ticker (annual and quarterly
//! financials, cash flow, balance sheet), each filtered to a fixed allow-list
//! of row labels. The timeseries endpoint keys each series by frequency plus
//! the row label with spaces stripped ("Total Revenue" -> "annualTotalRevenue").

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use peers_core::{sanitize_f64, PeersError};
use serde_json::Value;

const BASE_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";

const FREQUENCIES: [&str; 2] = ["annual", "quarterly"];

/// Ten years of history is plenty for the 5Y maximum lookback.
const LOOKBACK_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Row labels permitted through each statement view. Frozen at construction.
#[derive(Debug, Clone)]
pub struct YahooAllowList {
    pub financials: Vec<&'static str>,
    pub balance_sheet: Vec<&'static str>,
    pub cashflow: Vec<&'static str>,
}

impl Default for YahooAllowList {
    fn default() -> Self {
        Self {
            financials: vec![
                "Basic Average Shares",
                "Basic EPS",
                "Diluted EPS",
                "EBIT",
                "EBITDA",
                "Normalized EBITDA",
                "Earnings From Equity Interest",
                "Selling General And Administration",
                "Operating Income",
                "Total Revenue",
                "Interest Expense",
            ],
            balance_sheet: vec![
                "Inventory",
                "Net Debt",
                "Receivables",
                "Stockholders Equity",
                "Total Liabilities Net Minority Interest",
                "Current Assets",
                "Payables",
                "Current Liabilities",
            ],
            cashflow: vec![
                "Capital Expenditure",
                "Cash Flow From Continuing Financing Activities",
                "Cash Flow From Continuing Investing Activities",
                "Cash Flow From Continuing Operating Activities",
            ],
        }
    }
}

/// Statement section a row label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Financials,
    BalanceSheet,
    Cashflow,
}

impl YahooAllowList {
    fn labels(&self) -> impl Iterator<Item = (Section, &'static str)> + '_ {
        let fin = self.financials.iter().map(|l| (Section::Financials, *l));
        let bs = self.balance_sheet.iter().map(|l| (Section::BalanceSheet, *l));
        let cf = self.cashflow.iter().map(|l| (Section::Cashflow, *l));
        fin.chain(bs).chain(cf)
    }

    /// `"Total Revenue"` -> `"annualTotalRevenue"` / `"quarterlyTotalRevenue"`.
    fn timeseries_key(freq: &str, label: &str) -> String {
        format!("{}{}", freq, label.replace(' ', ""))
    }
}

/// Period ("YYYY-MM-DD") -> row label -> value.
pub type StatementTable = BTreeMap<String, BTreeMap<String, Option<f64>>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementViews {
    pub financials: StatementTable,
    pub cashflow: StatementTable,
    pub balance_sheet: StatementTable,
}

impl StatementViews {
    fn table_mut(&mut self, section: Section) -> &mut StatementTable {
        match section {
            Section::Financials => &mut self.financials,
            Section::BalanceSheet => &mut self.balance_sheet,
            Section::Cashflow => &mut self.cashflow,
        }
    }
}

/// Raw per-ticker payload. `error` is set (with empty views) when the fetch
/// failed as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YahooSnapshot {
    pub annual: StatementViews,
    pub quarterly: StatementViews,
    pub error: Option<String>,
}

impl YahooSnapshot {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    allow_list: YahooAllowList,
}

impl YahooClient {
    pub fn new() -> Self {
        Self::with_allow_list(YahooAllowList::default())
    }

    pub fn with_allow_list(allow_list: YahooAllowList) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: std::env::var("YAHOO_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string()),
            allow_list,
        }
    }

    /// Fetch the four statement views for a ticker. Never fails past its own
    /// boundary: any transport or parse error yields an error-shaped snapshot.
    pub async fn fetch_fundamentals(&self, ticker: &str) -> YahooSnapshot {
        match self.fetch_inner(ticker).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Yahoo fundamentals failed for {}: {}", ticker, e);
                YahooSnapshot::from_error(e.to_string())
            }
        }
    }

    async fn fetch_inner(&self, ticker: &str) -> Result<YahooSnapshot, PeersError> {
        let mut snapshot = YahooSnapshot::default();
        let period2 = Utc::now().timestamp();
        let period1 = period2 - LOOKBACK_SECS;

        for freq in FREQUENCIES {
            let types: Vec<String> = self
                .allow_list
                .labels()
                .map(|(_, label)| YahooAllowList::timeseries_key(freq, label))
                .collect();

            let url = format!("{}/{}", self.base_url, ticker);
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("type", types.join(",").as_str()),
                    ("period1", period1.to_string().as_str()),
                    ("period2", period2.to_string().as_str()),
                ])
                .send()
                .await
                .map_err(|e| PeersError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(PeersError::ApiError(format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                )));
            }

            let json: Value = response
                .json()
                .await
                .map_err(|e| PeersError::ApiError(e.to_string()))?;

            let views = match freq {
                "annual" => &mut snapshot.annual,
                _ => &mut snapshot.quarterly,
            };
            self.unpack_timeseries(freq, &json, views);
        }

        Ok(snapshot)
    }

    /// Fold one timeseries response into the per-section tables.
    fn unpack_timeseries(&self, freq: &str, json: &Value, views: &mut StatementViews) {
        let results = json
            .get("timeseries")
            .and_then(|v| v.get("result"))
            .and_then(|v| v.as_array());
        let Some(results) = results else { return };

        for result in results {
            let Some(series_key) = result
                .get("meta")
                .and_then(|m| m.get("type"))
                .and_then(|t| t.as_array())
                .and_then(|arr| arr.first())
                .and_then(|v| v.as_str())
            else {
                continue;
            };

            let Some((section, label)) = self.allow_list.labels().find(|(_, label)| {
                YahooAllowList::timeseries_key(freq, label) == series_key
            }) else {
                continue;
            };

            let Some(items) = result.get(series_key).and_then(|v| v.as_array()) else {
                continue;
            };

            let table = views.table_mut(section);
            for item in items {
                let Some(as_of) = item.get("asOfDate").and_then(|v| v.as_str()) else {
                    continue;
                };
                let value = item
                    .get("reportedValue")
                    .and_then(|v| v.get("raw"))
                    .and_then(|v| v.as_f64())
                    .and_then(sanitize_f64);
                table
                    .entry(as_of.to_string())
                    .or_default()
                    .insert(label.to_string(), value);
            }
        }
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch seam for the Yahoo pipeline.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn fetch_fundamentals(&self, ticker: &str) -> YahooSnapshot;
}

#[async_trait]
impl FundamentalsSource for YahooClient {
    async fn fetch_fundamentals(&self, ticker: &str) -> YahooSnapshot {
        YahooClient::fetch_fundamentals(self, ticker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timeseries_key_strips_spaces() {
        assert_eq!(
            YahooAllowList::timeseries_key("annual", "Total Revenue"),
            "annualTotalRevenue"
        );
        assert_eq!(
            YahooAllowList::timeseries_key("quarterly", "Basic EPS"),
            "quarterlyBasicEPS"
        );
    }

    #[test]
    fn unpack_routes_labels_to_their_section() {
        let client = YahooClient::new();
        let json = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"type": ["annualTotalRevenue"], "symbol": ["AAPL"]},
                        "annualTotalRevenue": [
                            {"asOfDate": "2023-09-30", "reportedValue": {"raw": 383285000000.0}},
                            {"asOfDate": "2024-09-30", "reportedValue": {"raw": 391035000000.0}},
                        ],
                    },
                    {
                        "meta": {"type": ["annualNetDebt"], "symbol": ["AAPL"]},
                        "annualNetDebt": [
                            {"asOfDate": "2023-09-30", "reportedValue": {"raw": 81123000000.0}},
                        ],
                    },
                    // Series nobody asked for are ignored.
                    {
                        "meta": {"type": ["annualTaxRate"], "symbol": ["AAPL"]},
                        "annualTaxRate": [
                            {"asOfDate": "2023-09-30", "reportedValue": {"raw": 0.147}},
                        ],
                    },
                ],
                "error": null,
            }
        });

        let mut views = StatementViews::default();
        client.unpack_timeseries("annual", &json, &mut views);

        assert_eq!(
            views.financials["2023-09-30"]["Total Revenue"],
            Some(383285000000.0)
        );
        assert_eq!(views.financials.len(), 2);
        assert_eq!(views.balance_sheet["2023-09-30"]["Net Debt"], Some(81123000000.0));
        assert!(views.cashflow.is_empty());
    }

    #[test]
    fn unpack_tolerates_missing_values() {
        let client = YahooClient::new();
        let json = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"type": ["quarterlyBasicEPS"]},
                        "quarterlyBasicEPS": [
                            null,
                            {"asOfDate": "2024-03-31", "reportedValue": {"raw": 1.53}},
                            {"asOfDate": "2024-06-30"},
                        ],
                    },
                ],
            }
        });

        let mut views = StatementViews::default();
        client.unpack_timeseries("quarterly", &json, &mut views);

        assert_eq!(views.financials["2024-03-31"]["Basic EPS"], Some(1.53));
        assert_eq!(views.financials["2024-06-30"]["Basic EPS"], None);
    }

    #[test]
    fn error_snapshot_is_empty() {
        let snap = YahooSnapshot::from_error("connection refused");
        assert_eq!(snap.error.as_deref(), Some("connection refused"));
        assert!(snap.annual.financials.is_empty());
        assert!(snap.quarterly.financials.is_empty());
    }
}
