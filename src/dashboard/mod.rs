//! Read-only dashboard API
//!
//! Serves published signals, executed trades, raw price history and their
//! aggregates over HTTP. Nothing here writes to a store.

mod api;
pub mod types;

pub use api::create_router;
pub use types::ApiResponse;

use std::sync::Arc;

use crate::store::{PriceStore, SignalStore, TradeStore};

/// Shared handler state
#[derive(Clone)]
pub struct DashboardState {
    pub signals: Arc<dyn SignalStore>,
    pub trades: Arc<dyn TradeStore>,
    pub prices: Arc<dyn PriceStore>,
    pub instruments: Vec<String>,
}

/// Start the dashboard server
pub async fn start_server(state: DashboardState, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Dashboard API starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{ExecutionMode, NotionalUnit, RawPricePoint, SignalAction, SignalDocument, TradeRecord, TradeSide};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn seeded() -> DashboardState {
        let store = Arc::new(MemoryStore::new());
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for (i, action) in [SignalAction::Hold, SignalAction::Buy].into_iter().enumerate() {
            let doc = SignalDocument::new("BTC/USDT", base + Duration::minutes(5 * i as i64), dec!(1), 25.0, action);
            SignalStore::insert(store.as_ref(), &doc).await.unwrap();
        }
        store.push_prices([
            RawPricePoint::new("BTC/USDT", base, "67000000000000000000000"),
            RawPricePoint::new("BTC/USDT", base + Duration::minutes(1), "67100000000000000000000"),
            RawPricePoint::new("BTC/USDT", base + Duration::minutes(2), "67200000000000000000000"),
        ]);
        for (instrument, action, price) in [
            ("BTC/USDT", TradeSide::Buy, dec!(67000)),
            ("ETH/USDT", TradeSide::Sell, dec!(3000)),
        ] {
            let trade = TradeRecord {
                id: Uuid::new_v4(),
                instrument: instrument.to_string(),
                action,
                mode: ExecutionMode::Simulated,
                notional: dec!(100),
                notional_unit: NotionalUnit::Usd,
                price,
                timestamp: base,
                oscillator: 50.0,
                transaction_hash: None,
                executed_at: Utc::now(),
            };
            TradeStore::insert(store.as_ref(), &trade).await.unwrap();
        }
        DashboardState {
            signals: store.clone(),
            trades: store.clone(),
            prices: store,
            instruments: vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
        }
    }

    async fn get(state: DashboardState, uri: &str) -> (StatusCode, Value) {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn latest_signals_skip_instruments_without_data() {
        let (status, body) = get(seeded().await, "/api/signals/latest").await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["action"], 1);
    }

    #[tokio::test]
    async fn signals_are_filtered_and_limited() {
        let (_, body) = get(seeded().await, "/api/signals?pair=btc-usdt&limit=1").await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["instrument"], "BTC/USDT");
    }

    #[tokio::test]
    async fn current_price_and_missing_pair() {
        let (status, body) = get(seeded().await, "/api/prices/current?pair=BTC-USDT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["price"], "67200000000000000000000");

        let (status, body) = get(seeded().await, "/api/prices/current?pair=SOL-USDT").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn price_history_is_newest_first_and_limited() {
        let (status, body) = get(seeded().await, "/api/prices?pair=btc-usdt&limit=2").await;
        assert_eq!(status, StatusCode::OK);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["price"], "67200000000000000000000");
        assert_eq!(data[1]["price"], "67100000000000000000000");

        let (_, body) = get(seeded().await, "/api/prices?pair=SOL-USDT").await;
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn signals_filter_by_action_code() {
        let (_, body) = get(seeded().await, "/api/signals?action=0").await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["action"], 0);

        let (_, body) = get(seeded().await, "/api/signals?action=2").await;
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn signal_stats_count_each_action() {
        let (status, body) = get(seeded().await, "/api/signals/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_count"], 2);
        assert_eq!(body["data"]["pairs"], serde_json::json!(["BTC/USDT"]));
        let by_action = body["data"]["by_action"].as_array().unwrap();
        assert_eq!(by_action.len(), 2);
        assert_eq!(by_action[0]["label"], "HOLD");
        assert_eq!(by_action[1]["label"], "BUY");
    }

    #[tokio::test]
    async fn trades_filter_by_pair() {
        let (status, body) = get(seeded().await, "/api/trades").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, body) = get(seeded().await, "/api/trades?pair=eth-usdt").await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["action"], "SELL");
    }

    #[tokio::test]
    async fn trade_stats_summarize_the_ledger() {
        let (status, body) = get(seeded().await, "/api/trades/stats").await;
        assert_eq!(status, StatusCode::OK);
        let stats = &body["data"];
        assert_eq!(stats["total_trades"], 2);
        assert_eq!(stats["buy_count"], 1);
        assert_eq!(stats["sell_count"], 1);
        assert_eq!(stats["total_volume"], "200");
        assert_eq!(stats["average_price"], "35000");
        assert_eq!(stats["pairs"], serde_json::json!(["BTC/USDT", "ETH/USDT"]));
    }
}
