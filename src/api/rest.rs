// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are public:
//
//   GET  /api/v1/health                         liveness + data source
//   GET  /api/v1/candles?symbol=IBM&interval=   bars with EMA overlays
//   POST /api/v1/scan                           score and rank a batch
//
// Bad input is answered with 400, a defective provider series with 502, both
// as `{ "error": "..." }`.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::api::request::{normalize_symbol, parse_interval, RequestError, ScanRequest};
use crate::app_state::AppState;
use crate::indicators::ema::ema_series;
use crate::indicators::{EMA_FAST, EMA_MID, EMA_SLOW};
use crate::market_data::{Bar, FetchError};
use crate::scoring::SetupResult;
use crate::types::{DataSource, Interval};

/// Symbol served by `/candles` when none is given.
pub const DEFAULT_SYMBOL: &str = "IBM";

type ApiError = (StatusCode, Json<Value>);

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/candles", get(candles))
        .route("/api/v1/scan", post(scan))
        .layer(cors)
        .with_state(state)
}

fn bad_request(e: RequestError) -> ApiError {
    warn!(error = %e, "request rejected");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": e.to_string() })),
    )
}

fn bad_gateway(e: FetchError) -> ApiError {
    error!(error = %e, "bar fetch failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": e.to_string() })),
    )
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    source: DataSource,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        source: state.source(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Candles
// =============================================================================

#[derive(Deserialize)]
struct CandlesQuery {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    interval: Option<String>,
}

#[derive(Serialize)]
struct CandlesResponse {
    symbol: String,
    interval: Interval,
    source: DataSource,
    candles: Vec<Bar>,
    ema9: Vec<Option<f64>>,
    ema21: Vec<Option<f64>>,
    ema50: Vec<Option<f64>>,
}

async fn candles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CandlesQuery>,
) -> Result<Json<CandlesResponse>, ApiError> {
    let raw_symbol = query
        .symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SYMBOL);
    let symbol = normalize_symbol(raw_symbol).map_err(bad_request)?;
    let interval = parse_interval(query.interval.as_deref(), state.config.default_interval)
        .map_err(bad_request)?;

    let bars = state
        .bar_source
        .fetch(&symbol, interval)
        .await
        .map_err(bad_gateway)?;

    Ok(Json(CandlesResponse {
        ema9: ema_series(&bars, EMA_FAST),
        ema21: ema_series(&bars, EMA_MID),
        ema50: ema_series(&bars, EMA_SLOW),
        symbol,
        interval,
        source: state.source(),
        candles: bars,
    }))
}

// =============================================================================
// Scan
// =============================================================================

#[derive(Serialize)]
struct ScanResponse {
    interval: Interval,
    source: DataSource,
    results: Vec<SetupResult>,
}

async fn scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let valid = req
        .validate(state.config.max_batch, state.config.default_interval)
        .map_err(bad_request)?;

    info!(
        symbols = ?valid.symbols,
        interval = %valid.interval,
        "scan requested"
    );

    let results = state
        .scanner
        .scan(&valid.symbols, valid.interval)
        .await
        .map_err(bad_gateway)?;

    Ok(Json(ScanResponse {
        interval: valid.interval,
        source: state.source(),
        results,
    }))
}
