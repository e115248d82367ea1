//! HTTP surface for PeerIQ: three read-only endpoints that chain the agent
//! discovery layer into the provider aggregation pipeline.

pub mod peers_routes;

use std::sync::Arc;

use agent_discovery::{ChatClient, DiscoveryClient, DiscoveryProvider};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use fmp_client::{FmpClient, FmpConfig};
use market_data::{FinnhubClient, FinnhubConfig, YahooClient};
use peers_aggregator::{AggregatorConfig, PeerAggregator};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<PeerAggregator>,
    pub discovery: Arc<dyn DiscoveryProvider>,
}

impl AppState {
    /// Wire the real provider clients and discovery agents from env config.
    pub fn from_env() -> Self {
        let yahoo = Arc::new(YahooClient::new());
        let finnhub = Arc::new(FinnhubClient::new(FinnhubConfig::from_env()));
        let fmp = Arc::new(FmpClient::new(FmpConfig::from_env()));
        let aggregator = Arc::new(PeerAggregator::new(
            yahoo,
            finnhub,
            fmp,
            AggregatorConfig::default(),
        ));
        let discovery = Arc::new(DiscoveryClient::new(ChatClient::from_env()));

        Self {
            aggregator,
            discovery,
        }
    }
}

/// Request-level failures. Provider-level failures never reach this type;
/// they degrade into partial results inside the aggregation pipeline.
#[derive(Debug)]
pub enum ApiError {
    /// A required query parameter was absent. Rejected before any fetch work.
    MissingParam(&'static str),
    NotFound(&'static str),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingParam(param) => (
                StatusCode::BAD_REQUEST,
                format!("{param} query parameter required"),
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.to_string()),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(peers_routes::peers_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let state = AppState::from_env();
    let app = router(state);

    let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("API_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = format!("{host}:{port}");

    tracing::info!("PeerIQ API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
