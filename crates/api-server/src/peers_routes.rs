//! Peer financial data API routes.
//!
//! Missing required parameters reject with 400 before any fetch work; empty
//! discovery results map to 404. Provider failures inside the aggregation
//! pipeline degrade to partial results and still return 200.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use peers_core::CompanyFinancials;
use serde::Deserialize;

use crate::{ApiError, AppState};

fn default_range() -> String {
    "1Y".to_string()
}

fn default_limit() -> usize {
    6
}

#[derive(Deserialize)]
pub struct IndustryQuery {
    pub industry: Option<String>,
    #[serde(default = "default_range")]
    pub range: String,
}

#[derive(Deserialize)]
pub struct CompetitorsQuery {
    pub ticker: Option<String>,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Deserialize)]
pub struct FmpDataQuery {
    pub industry: Option<String>,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

pub fn peers_routes() -> Router<AppState> {
    Router::new()
        .route("/api/industry-leaders", get(industry_leaders))
        .route("/api/competitors", get(competitors))
        .route("/api/fmp-data", get(fmp_data))
}

/// Page `offset` of size `limit` out of the discovered metric labels.
fn slice_metrics(metrics: &[String], limit: usize, offset: usize) -> &[String] {
    let start = metrics.len().min(offset.saturating_mul(limit));
    let end = metrics
        .len()
        .min(offset.saturating_add(1).saturating_mul(limit));
    &metrics[start..end]
}

async fn industry_leaders(
    State(state): State<AppState>,
    Query(query): Query<IndustryQuery>,
) -> Result<Json<Vec<CompanyFinancials>>, ApiError> {
    let industry = query.industry.ok_or(ApiError::MissingParam("industry"))?;

    let tickers = match state.discovery.tickers_by_industry(&industry).await {
        Ok(tickers) => tickers,
        Err(e) => {
            tracing::warn!("Ticker discovery failed for '{}': {}", industry, e);
            Vec::new()
        }
    };
    tracing::info!("Found {} tickers for industry '{}'", tickers.len(), industry);

    if tickers.is_empty() {
        return Err(ApiError::NotFound("No tickers found for industry"));
    }

    Ok(Json(
        state.aggregator.peer_financials(&tickers, &query.range).await,
    ))
}

async fn competitors(
    State(state): State<AppState>,
    Query(query): Query<CompetitorsQuery>,
) -> Result<Json<Vec<CompanyFinancials>>, ApiError> {
    let ticker = query.ticker.ok_or(ApiError::MissingParam("ticker"))?;

    let (industry, competitors) = match state.discovery.competitors_by_ticker(&ticker).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!("Competitor discovery failed for '{}': {}", ticker, e);
            return Err(ApiError::NotFound("No competitors found for ticker"));
        }
    };
    if competitors.is_empty() {
        return Err(ApiError::NotFound("No competitors found for ticker"));
    }

    let mut tickers = vec![ticker];
    tickers.extend(competitors);

    let all_metrics = match state.discovery.metrics_by_industry(&industry).await {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::warn!("Metric discovery failed for '{}': {}", industry, e);
            Vec::new()
        }
    };
    let selected = slice_metrics(&all_metrics, query.limit, query.offset);

    Ok(Json(
        state
            .aggregator
            .fmp_financials(&tickers, &query.range, selected)
            .await,
    ))
}

async fn fmp_data(
    State(state): State<AppState>,
    Query(query): Query<FmpDataQuery>,
) -> Result<Json<Vec<CompanyFinancials>>, ApiError> {
    let industry = query.industry.ok_or(ApiError::MissingParam("industry"))?;

    let tickers = match state.discovery.tickers_by_industry(&industry).await {
        Ok(tickers) => tickers,
        Err(e) => {
            tracing::warn!("Ticker discovery failed for '{}': {}", industry, e);
            Vec::new()
        }
    };
    let all_metrics = match state.discovery.metrics_by_industry(&industry).await {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::warn!("Metric discovery failed for '{}': {}", industry, e);
            Vec::new()
        }
    };
    let selected = slice_metrics(&all_metrics, query.limit, query.offset);

    Ok(Json(
        state
            .aggregator
            .fmp_financials(&tickers, &query.range, selected)
            .await,
    ))
}
