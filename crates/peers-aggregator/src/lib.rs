//! Fans provider calls out per ticker, merges per-provider records, applies
//! the lookback window, and sorts each metric's series.
//!
//! Two paths: the merged Yahoo+Finnhub path used for industry peers, and the
//! FMP-only path used when the caller supplies explicit metric labels. Each
//! ticker's pipeline is independent; a provider failure for one ticker never
//! touches another ticker's data.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use fmp_client::{transform_statements, StatementSource};
use market_data::{
    transform_finnhub, transform_yahoo, FundamentalsSource, ReportedFinancialsSource,
};
use peers_core::{CompanyFinancials, FiscalQuarter, PeriodWindow};
use tokio::sync::Semaphore;

/// Concurrency bounds, frozen at construction.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Bound for the Yahoo/Finnhub fan-outs. Kept small to respect the
    /// providers' rate limits.
    pub provider_concurrency: usize,
    /// Bound for the FMP fan-out.
    pub fmp_concurrency: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            provider_concurrency: 5,
            fmp_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

pub struct PeerAggregator {
    yahoo: Arc<dyn FundamentalsSource>,
    finnhub: Arc<dyn ReportedFinancialsSource>,
    fmp: Arc<dyn StatementSource>,
    config: AggregatorConfig,
}

impl PeerAggregator {
    pub fn new(
        yahoo: Arc<dyn FundamentalsSource>,
        finnhub: Arc<dyn ReportedFinancialsSource>,
        fmp: Arc<dyn StatementSource>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            yahoo,
            finnhub,
            fmp,
            config,
        }
    }

    /// Merged Yahoo + Finnhub financials for a set of tickers, windowed by
    /// the lookback range relative to today.
    pub async fn peer_financials(
        &self,
        tickers: &[String],
        range: &str,
    ) -> Vec<CompanyFinancials> {
        self.peer_financials_in_window(tickers, PeriodWindow::current(range))
            .await
    }

    /// Same as [`peer_financials`](Self::peer_financials) with an explicit
    /// window, so the cutoff date can be pinned.
    pub async fn peer_financials_in_window(
        &self,
        tickers: &[String],
        window: PeriodWindow,
    ) -> Vec<CompanyFinancials> {
        let yahoo_records = self.fetch_yahoo_records(tickers).await;
        let finnhub_records = self.fetch_finnhub_records(tickers).await;
        merge_records(tickers, vec![yahoo_records, finnhub_records], &window)
    }

    /// FMP-only financials restricted to the caller's metric labels. One
    /// record per ticker in request order, no merge step.
    pub async fn fmp_financials(
        &self,
        tickers: &[String],
        range: &str,
        metrics: &[String],
    ) -> Vec<CompanyFinancials> {
        self.fmp_financials_in_window(tickers, metrics, PeriodWindow::current(range))
            .await
    }

    pub async fn fmp_financials_in_window(
        &self,
        tickers: &[String],
        metrics: &[String],
        window: PeriodWindow,
    ) -> Vec<CompanyFinancials> {
        let semaphore = Arc::new(Semaphore::new(self.config.fmp_concurrency));
        let metrics: Arc<Vec<String>> = Arc::new(metrics.to_vec());
        let mut handles = Vec::new();

        for ticker in tickers {
            let sem = Arc::clone(&semaphore);
            let source = Arc::clone(&self.fmp);
            let metrics = Arc::clone(&metrics);
            let ticker = ticker.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.unwrap();
                let entries = source.fetch_statements(&ticker).await;
                transform_statements(&ticker, &entries, &metrics, &window)
            }));
        }

        let mut records = Vec::new();
        for (i, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("FMP task for {} panicked: {}", tickers[i], e);
                    records.push(CompanyFinancials::new(tickers[i].clone()));
                }
            }
        }
        records
    }

    async fn fetch_yahoo_records(&self, tickers: &[String]) -> Vec<CompanyFinancials> {
        let semaphore = Arc::new(Semaphore::new(self.config.provider_concurrency));
        let mut handles = Vec::new();

        for ticker in tickers {
            let sem = Arc::clone(&semaphore);
            let source = Arc::clone(&self.yahoo);
            let ticker = ticker.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.unwrap();
                let snapshot = source.fetch_fundamentals(&ticker).await;
                transform_yahoo(&ticker, &snapshot)
            }));
        }

        collect_records(handles, "Yahoo").await
    }

    async fn fetch_finnhub_records(&self, tickers: &[String]) -> Vec<CompanyFinancials> {
        let semaphore = Arc::new(Semaphore::new(self.config.provider_concurrency));
        let mut handles = Vec::new();

        for ticker in tickers {
            let sem = Arc::clone(&semaphore);
            let source = Arc::clone(&self.finnhub);
            let ticker = ticker.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await.unwrap();
                let reports = source.fetch_reported(&ticker).await;
                transform_finnhub(&ticker, &reports)
            }));
        }

        collect_records(handles, "Finnhub").await
    }
}

async fn collect_records(
    handles: Vec<tokio::task::JoinHandle<CompanyFinancials>>,
    provider: &str,
) -> Vec<CompanyFinancials> {
    let mut records = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("{} task panicked: {}", provider, e),
        }
    }
    records
}

/// Union per-provider records per ticker, drop points older than the window's
/// lower bound, and sort each series.
///
/// A metric reported by more than one provider keeps both series concatenated
/// (duplicate periods included); nothing is deduplicated or averaged. Output
/// carries one record per requested ticker, in request order.
pub fn merge_records(
    tickers: &[String],
    batches: Vec<Vec<CompanyFinancials>>,
    window: &PeriodWindow,
) -> Vec<CompanyFinancials> {
    let mut by_ticker: BTreeMap<String, CompanyFinancials> = BTreeMap::new();
    for record in batches.into_iter().flatten() {
        by_ticker
            .entry(record.ticker.clone())
            .or_insert_with(|| CompanyFinancials::new(record.ticker.clone()))
            .absorb(record);
    }

    let mut result = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let record = by_ticker
            .remove(ticker)
            .unwrap_or_else(|| CompanyFinancials::new(ticker.clone()));
        result.push(finalize(record, window));
    }
    // A provider answering under a ticker nobody requested still surfaces
    // exactly once rather than being dropped on the floor.
    for (_, record) in by_ticker {
        result.push(finalize(record, window));
    }
    result
}

fn finalize(mut record: CompanyFinancials, window: &PeriodWindow) -> CompanyFinancials {
    for series in record.financials.values_mut() {
        series.retain(|point| match FiscalQuarter::parse_label(&point.period) {
            Some(quarter) => quarter >= window.min,
            // Labels that parse neither as a quarter nor a bare year are
            // retained rather than silently dropped.
            None => true,
        });
    }
    record.sort_series();
    record
}
