//! Dashboard HTTP API
//!
//! Read-only endpoints over the signal, trade and price stores.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use super::types::*;
use super::DashboardState;

const DEFAULT_LIMIT: usize = 50;
const DEFAULT_PRICE_LIMIT: usize = 100;
const MAX_LIMIT: usize = 500;

/// Create the API router with all endpoints
pub fn create_router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/signals/latest", get(get_latest_signals))
        .route("/api/signals/stats", get(get_signal_stats))
        .route("/api/signals", get(get_signals))
        .route("/api/trades/stats", get(get_trade_stats))
        .route("/api/trades", get(get_trades))
        .route("/api/prices/current", get(get_current_price))
        .route("/api/prices", get(get_price_history))
        .with_state(state)
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn ok<T: Serialize>(data: T) -> Response {
    Json(ApiResponse::success(data)).into_response()
}

fn fail(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(msg))).into_response()
}

fn store_error(e: anyhow::Error) -> Response {
    tracing::warn!(error = %e, "Dashboard store query failed");
    fail(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
}

/// "btc-usdt" and "BTC/USDT" name the same instrument
fn normalize_pair(pair: &str) -> String {
    pair.trim().replace('-', "/").to_uppercase()
}

fn clamp_limit(limit: Option<usize>) -> usize {
    clamp_limit_or(limit, DEFAULT_LIMIT)
}

fn clamp_limit_or(limit: Option<usize>, default: usize) -> usize {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

/// GET /api/health
async fn get_health(State(state): State<DashboardState>) -> Response {
    ok(HealthStatus {
        status: "OK".to_string(),
        instruments: state.instruments.clone(),
        timestamp: Utc::now(),
    })
}

/// GET /api/signals/latest - latest signal per configured instrument
async fn get_latest_signals(State(state): State<DashboardState>) -> Response {
    let mut latest = Vec::with_capacity(state.instruments.len());
    for instrument in &state.instruments {
        match state.signals.latest(instrument).await {
            Ok(Some(signal)) => latest.push(signal),
            Ok(None) => {}
            Err(e) => return store_error(e),
        }
    }
    ok(latest)
}

/// GET /api/signals?pair=BTC/USDT&action=1&limit=50
async fn get_signals(State(state): State<DashboardState>, Query(query): Query<SignalsQuery>) -> Response {
    let pair = query.pair.as_deref().map(normalize_pair);
    let limit = clamp_limit(query.limit);

    let Some(action) = query.action else {
        return match state.signals.recent(pair.as_deref(), limit).await {
            Ok(signals) => ok(signals),
            Err(e) => store_error(e),
        };
    };

    match state.signals.recent(pair.as_deref(), usize::MAX).await {
        Ok(signals) => ok(signals
            .into_iter()
            .filter(|s| s.action == action)
            .take(limit)
            .collect::<Vec<_>>()),
        Err(e) => store_error(e),
    }
}

/// GET /api/signals/stats
async fn get_signal_stats(State(state): State<DashboardState>) -> Response {
    match state.signals.recent(None, usize::MAX).await {
        Ok(signals) => ok(SignalStats::from_signals(&signals)),
        Err(e) => store_error(e),
    }
}

/// GET /api/trades?pair=BTC/USDT&limit=50
async fn get_trades(State(state): State<DashboardState>, Query(query): Query<TradesQuery>) -> Response {
    let pair = query.pair.as_deref().map(normalize_pair);
    match state.trades.recent(pair.as_deref(), clamp_limit(query.limit)).await {
        Ok(trades) => ok(trades),
        Err(e) => store_error(e),
    }
}

/// GET /api/trades/stats
async fn get_trade_stats(State(state): State<DashboardState>) -> Response {
    match state.trades.recent(None, usize::MAX).await {
        Ok(trades) => ok(TradeStats::from_trades(&trades)),
        Err(e) => store_error(e),
    }
}

/// GET /api/prices/current?pair=BTC/USDT
async fn get_current_price(State(state): State<DashboardState>, Query(query): Query<PriceQuery>) -> Response {
    let pair = normalize_pair(&query.pair);
    match state.prices.recent(&pair, 1).await {
        Ok(points) => match points.into_iter().next() {
            Some(point) => ok(point),
            None => fail(StatusCode::NOT_FOUND, format!("no price data for {}", pair)),
        },
        Err(e) => store_error(e),
    }
}

/// GET /api/prices?pair=BTC/USDT&limit=100 - newest first
async fn get_price_history(
    State(state): State<DashboardState>,
    Query(query): Query<PriceHistoryQuery>,
) -> Response {
    let pair = normalize_pair(&query.pair);
    match state.prices.recent(&pair, clamp_limit_or(query.limit, DEFAULT_PRICE_LIMIT)).await {
        Ok(points) => ok(points),
        Err(e) => store_error(e),
    }
}
