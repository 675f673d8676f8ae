//! Store traits consumed by the strategy controller and the GEX capture.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::models::{MarkRecord, OrderLegRecord, PositionRecord};

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn save_leg(&self, record: &OrderLegRecord) -> Result<()>;

    /// Legs of orders the brokerage has not reported filled yet.
    async fn find_unfilled_legs(&self) -> Result<Vec<OrderLegRecord>>;

    async fn mark_filled(&self, order_id: i64, filled: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn save(&self, record: &PositionRecord) -> Result<()>;

    async fn find_open(&self) -> Result<Vec<PositionRecord>>;

    async fn find_open_by_symbols(&self, symbols: &[String]) -> Result<Vec<PositionRecord>>;

    /// Records the exit for an open position.
    async fn close(
        &self,
        symbol: &str,
        sell_price: Option<Decimal>,
        closed: DateTime<Utc>,
    ) -> Result<()>;

    async fn find_closed_since(&self, since: DateTime<Utc>) -> Result<Vec<PositionRecord>>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn save_mark(&self, record: &MarkRecord) -> Result<()>;
}

/// GEX snapshots are persisted opaquely, keyed by (symbol, captured-at).
#[async_trait]
pub trait GexSnapshotStore: Send + Sync {
    async fn save_snapshot(
        &self,
        symbol: &str,
        created: DateTime<Utc>,
        data: &JsonValue,
    ) -> Result<()>;

    async fn latest_snapshot(&self, symbol: &str) -> Result<Option<JsonValue>>;

    async fn capture_times(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>>;

    async fn snapshots_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<JsonValue>>;
}
