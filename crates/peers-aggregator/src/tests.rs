use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use fmp_client::StatementSource;
use market_data::{
    FreqReports, FundamentalsSource, LineItem, ReportEntry, ReportedFinancials,
    ReportedFinancialsSource, StatementReport, YahooSnapshot,
};
use peers_core::{CompanyFinancials, DataPoint, PeriodWindow};
use serde_json::{json, Value};

use crate::{merge_records, AggregatorConfig, PeerAggregator};

fn window() -> PeriodWindow {
    // Pinned "today": 2024-06-15, 1Y lookback -> [2023-Q2, 2024-Q2].
    PeriodWindow::for_range("1Y", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
}

fn record(ticker: &str, metric: &str, points: &[(&str, f64)]) -> CompanyFinancials {
    let mut record = CompanyFinancials::new(ticker);
    for (period, value) in points {
        record.push_point(metric, period.to_string(), *value);
    }
    record
}

struct MockYahoo {
    data: HashMap<String, YahooSnapshot>,
}

#[async_trait]
impl FundamentalsSource for MockYahoo {
    async fn fetch_fundamentals(&self, ticker: &str) -> YahooSnapshot {
        self.data
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| YahooSnapshot::from_error("connection refused"))
    }
}

struct MockFinnhub {
    data: HashMap<String, ReportedFinancials>,
}

#[async_trait]
impl ReportedFinancialsSource for MockFinnhub {
    async fn fetch_reported(&self, ticker: &str) -> ReportedFinancials {
        self.data.get(ticker).cloned().unwrap_or_else(|| ReportedFinancials {
            quarterly: FreqReports::from_error("HTTP 401"),
            annual: FreqReports::from_error("HTTP 401"),
        })
    }
}

struct MockFmp {
    data: HashMap<String, Vec<Value>>,
}

#[async_trait]
impl StatementSource for MockFmp {
    async fn fetch_statements(&self, ticker: &str) -> Vec<Value> {
        self.data.get(ticker).cloned().unwrap_or_default()
    }
}

fn yahoo_snapshot(metric: &str, period: &str, value: f64) -> YahooSnapshot {
    let mut snapshot = YahooSnapshot::default();
    snapshot
        .quarterly
        .financials
        .entry(period.to_string())
        .or_default()
        .insert(metric.to_string(), Some(value));
    snapshot
}

fn finnhub_reports(metric: &str, year: i32, quarter: u32, value: f64) -> ReportedFinancials {
    ReportedFinancials {
        quarterly: FreqReports {
            data: vec![ReportEntry {
                year: Some(year),
                quarter: Some(quarter),
                report: StatementReport {
                    ic: vec![LineItem {
                        label: Some(metric.to_string()),
                        value: Some(json!(value)),
                    }],
                    ..StatementReport::default()
                },
            }],
            error: None,
        },
        ..ReportedFinancials::default()
    }
}

fn aggregator(
    yahoo: MockYahoo,
    finnhub: MockFinnhub,
    fmp: MockFmp,
) -> PeerAggregator {
    PeerAggregator::new(
        Arc::new(yahoo),
        Arc::new(finnhub),
        Arc::new(fmp),
        AggregatorConfig::default(),
    )
}

fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ---- merge_records (pure) --------------------------------------------------

#[test]
fn merge_unions_metrics_per_ticker() {
    let batches = vec![
        vec![record("AAPL", "Total Revenue", &[("2024-Q1", 100.0)])],
        vec![
            record("AAPL", "Net income", &[("2024-Q1", 20.0)]),
            record("MSFT", "Net income", &[("2024-Q1", 30.0)]),
        ],
    ];

    let merged = merge_records(&tickers(&["AAPL", "MSFT"]), batches, &window());

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].ticker, "AAPL");
    assert!(merged[0].financials.contains_key("Total Revenue"));
    assert!(merged[0].financials.contains_key("Net income"));
    assert_eq!(merged[1].ticker, "MSFT");
    assert_eq!(merged[1].financials.len(), 1);
}

#[test]
fn merge_emits_each_ticker_exactly_once_in_request_order() {
    let batches = vec![
        vec![
            record("MSFT", "Revenues", &[("2024-Q1", 1.0)]),
            record("AAPL", "Revenues", &[("2024-Q1", 2.0)]),
        ],
        vec![record("AAPL", "Revenues", &[("2024-Q2", 3.0)])],
    ];

    let merged = merge_records(&tickers(&["AAPL", "MSFT"]), batches, &window());
    let order: Vec<&str> = merged.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(order, vec!["AAPL", "MSFT"]);
}

#[test]
fn merge_concatenates_duplicate_periods() {
    // Same metric, same period, from two providers: both points survive.
    let batches = vec![
        vec![record("AAPL", "Net income", &[("2024-Q1", 20.0)])],
        vec![record("AAPL", "Net income", &[("2024-Q1", 21.0)])],
    ];

    let merged = merge_records(&tickers(&["AAPL"]), batches, &window());
    let series = &merged[0].financials["Net income"];
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].period, "2024-Q1");
    assert_eq!(series[1].period, "2024-Q1");
}

#[test]
fn merge_drops_points_below_the_window_floor() {
    let batches = vec![vec![record(
        "AAPL",
        "Revenues",
        &[("2022-Q4", 1.0), ("2023-Q1", 2.0), ("2023-Q2", 3.0)],
    )]];

    let merged = merge_records(&tickers(&["AAPL"]), batches, &window());
    let periods: Vec<&str> = merged[0].financials["Revenues"]
        .iter()
        .map(|p| p.period.as_str())
        .collect();
    assert_eq!(periods, vec!["2023-Q2"]);
}

#[test]
fn merge_treats_annual_labels_as_q4() {
    let batches = vec![vec![record(
        "AAPL",
        "Total Revenue",
        &[("2022", 1.0), ("2023", 2.0)],
    )]];

    let merged = merge_records(&tickers(&["AAPL"]), batches, &window());
    let periods: Vec<&str> = merged[0].financials["Total Revenue"]
        .iter()
        .map(|p| p.period.as_str())
        .collect();
    // 2022 reads as 2022-Q4, below the 2023-Q2 floor; 2023 reads as 2023-Q4.
    assert_eq!(periods, vec!["2023"]);
}

#[test]
fn merge_retains_unparsable_period_labels() {
    let batches = vec![vec![record("AAPL", "Basic EPS", &[("TTM", 1.5)])]];
    let merged = merge_records(&tickers(&["AAPL"]), batches, &window());
    assert_eq!(merged[0].financials["Basic EPS"].len(), 1);
}

#[test]
fn merge_sorts_each_series() {
    let batches = vec![
        vec![record("AAPL", "Revenues", &[("2024-Q1", 3.0)])],
        vec![record("AAPL", "Revenues", &[("2023-Q3", 1.0), ("2023-Q4", 2.0)])],
    ];

    let merged = merge_records(&tickers(&["AAPL"]), batches, &window());
    let series = &merged[0].financials["Revenues"];
    let sorted = series
        .windows(2)
        .all(|w| peers_core::cmp_period_labels(&w[0].period, &w[1].period).is_le());
    assert!(sorted);

    // Re-merging the already-merged output changes nothing.
    let again = merge_records(&tickers(&["AAPL"]), vec![merged.clone()], &window());
    assert_eq!(again, merged);
}

#[test]
fn merge_yields_empty_record_for_ticker_with_no_data() {
    let merged = merge_records(&tickers(&["MSFT"]), vec![vec![], vec![]], &window());
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].ticker, "MSFT");
    assert!(merged[0].financials.is_empty());
}

// ---- aggregator over mock sources ------------------------------------------

#[tokio::test]
async fn peer_path_merges_both_providers() {
    let yahoo = MockYahoo {
        data: HashMap::from([(
            "AAPL".to_string(),
            yahoo_snapshot("Total Revenue", "2024-03-31", 100.0),
        )]),
    };
    let finnhub = MockFinnhub {
        data: HashMap::from([(
            "AAPL".to_string(),
            finnhub_reports("Net income", 2024, 1, 20.0),
        )]),
    };
    let agg = aggregator(yahoo, finnhub, MockFmp { data: HashMap::new() });

    let records = agg
        .peer_financials_in_window(&tickers(&["AAPL"]), window())
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].financials["Total Revenue"],
        vec![DataPoint {
            period: "2024-Q1".to_string(),
            value: Some(100.0),
        }]
    );
    assert_eq!(
        records[0].financials["Net income"],
        vec![DataPoint {
            period: "2024-Q1".to_string(),
            value: Some(20.0),
        }]
    );
}

#[tokio::test]
async fn one_provider_failing_leaves_the_other_intact() {
    // Finnhub has no data for anyone (error payloads); Yahoo only knows AAPL.
    let yahoo = MockYahoo {
        data: HashMap::from([(
            "AAPL".to_string(),
            yahoo_snapshot("Total Revenue", "2024-03-31", 100.0),
        )]),
    };
    let finnhub = MockFinnhub { data: HashMap::new() };
    let agg = aggregator(yahoo, finnhub, MockFmp { data: HashMap::new() });

    let records = agg
        .peer_financials_in_window(&tickers(&["AAPL", "MSFT"]), window())
        .await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ticker, "AAPL");
    assert_eq!(records[0].financials["Total Revenue"][0].value, Some(100.0));
    assert_eq!(records[1].ticker, "MSFT");
    assert!(records[1].financials.is_empty());
}

#[tokio::test]
async fn fmp_path_transforms_per_ticker_without_merging() {
    let fmp = MockFmp {
        data: HashMap::from([(
            "AAPL".to_string(),
            vec![json!({"fiscalYear": 2024, "period": "Q1", "revenue": 1000.0})],
        )]),
    };
    let agg = aggregator(
        MockYahoo { data: HashMap::new() },
        MockFinnhub { data: HashMap::new() },
        fmp,
    );

    let records = agg
        .fmp_financials_in_window(
            &tickers(&["AAPL", "MSFT"]),
            &["revenue".to_string()],
            window(),
        )
        .await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ticker, "AAPL");
    assert_eq!(
        records[0].financials["revenue"],
        vec![DataPoint {
            period: "2024-Q1".to_string(),
            value: Some(1000.0),
        }]
    );
    assert_eq!(records[1].ticker, "MSFT");
    assert!(records[1].financials.is_empty());
}

#[tokio::test]
async fn fmp_path_respects_the_metric_slice() {
    let fmp = MockFmp {
        data: HashMap::from([(
            "AAPL".to_string(),
            vec![json!({
                "fiscalYear": 2024,
                "period": "Q1",
                "revenue": 1.0,
                "ebitda": 2.0,
            })],
        )]),
    };
    let agg = aggregator(
        MockYahoo { data: HashMap::new() },
        MockFinnhub { data: HashMap::new() },
        fmp,
    );

    let records = agg
        .fmp_financials_in_window(&tickers(&["AAPL"]), &["ebitda".to_string()], window())
        .await;

    assert_eq!(records[0].financials.len(), 1);
    assert!(records[0].financials.contains_key("ebitda"));
}
