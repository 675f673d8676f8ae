//! In-memory store for simulated runs and tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use crate::models::{MarkRecord, OrderLegRecord, PositionRecord};
use crate::store::{GexSnapshotStore, OrderStore, PositionStore, QuoteStore};

/// One store implementing every persistence trait, backed by mutex-guarded
/// vectors. Critical sections never hold the lock across an await.
#[derive(Default)]
pub struct InMemoryStore {
    order_legs: Mutex<Vec<OrderLegRecord>>,
    positions: Mutex<Vec<PositionRecord>>,
    marks: Mutex<Vec<MarkRecord>>,
    snapshots: Mutex<BTreeMap<(String, DateTime<Utc>), JsonValue>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all_positions(&self) -> Vec<PositionRecord> {
        self.positions.lock().expect("positions lock").clone()
    }

    #[must_use]
    pub fn all_order_legs(&self) -> Vec<OrderLegRecord> {
        self.order_legs.lock().expect("order legs lock").clone()
    }

    #[must_use]
    pub fn all_marks(&self) -> Vec<MarkRecord> {
        self.marks.lock().expect("marks lock").clone()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn save_leg(&self, record: &OrderLegRecord) -> Result<()> {
        self.order_legs
            .lock()
            .expect("order legs lock")
            .push(record.clone());
        Ok(())
    }

    async fn find_unfilled_legs(&self) -> Result<Vec<OrderLegRecord>> {
        Ok(self
            .order_legs
            .lock()
            .expect("order legs lock")
            .iter()
            .filter(|leg| leg.filled.is_none())
            .cloned()
            .collect())
    }

    async fn mark_filled(&self, order_id: i64, filled: DateTime<Utc>) -> Result<()> {
        for leg in self.order_legs.lock().expect("order legs lock").iter_mut() {
            if leg.order_id == order_id && leg.filled.is_none() {
                leg.filled = Some(filled);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn save(&self, record: &PositionRecord) -> Result<()> {
        self.positions
            .lock()
            .expect("positions lock")
            .push(record.clone());
        Ok(())
    }

    async fn find_open(&self) -> Result<Vec<PositionRecord>> {
        Ok(self
            .positions
            .lock()
            .expect("positions lock")
            .iter()
            .filter(|p| p.is_open())
            .cloned()
            .collect())
    }

    async fn find_open_by_symbols(&self, symbols: &[String]) -> Result<Vec<PositionRecord>> {
        Ok(self
            .positions
            .lock()
            .expect("positions lock")
            .iter()
            .filter(|p| p.is_open() && symbols.contains(&p.symbol))
            .cloned()
            .collect())
    }

    async fn close(
        &self,
        symbol: &str,
        sell_price: Option<Decimal>,
        closed: DateTime<Utc>,
    ) -> Result<()> {
        for position in self.positions.lock().expect("positions lock").iter_mut() {
            if position.symbol == symbol && position.is_open() {
                position.sell_price = sell_price;
                position.closed = Some(closed);
            }
        }
        Ok(())
    }

    async fn find_closed_since(&self, since: DateTime<Utc>) -> Result<Vec<PositionRecord>> {
        Ok(self
            .positions
            .lock()
            .expect("positions lock")
            .iter()
            .filter(|p| p.closed.is_some_and(|closed| closed >= since))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuoteStore for InMemoryStore {
    async fn save_mark(&self, record: &MarkRecord) -> Result<()> {
        self.marks.lock().expect("marks lock").push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl GexSnapshotStore for InMemoryStore {
    async fn save_snapshot(
        &self,
        symbol: &str,
        created: DateTime<Utc>,
        data: &JsonValue,
    ) -> Result<()> {
        self.snapshots
            .lock()
            .expect("snapshots lock")
            .insert((symbol.to_string(), created), data.clone());
        Ok(())
    }

    async fn latest_snapshot(&self, symbol: &str) -> Result<Option<JsonValue>> {
        Ok(self
            .snapshots
            .lock()
            .expect("snapshots lock")
            .iter()
            .filter(|((s, _), _)| s == symbol)
            .next_back()
            .map(|(_, data)| data.clone()))
    }

    async fn capture_times(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        Ok(self
            .snapshots
            .lock()
            .expect("snapshots lock")
            .keys()
            .filter(|(s, at)| s == symbol && (start..=end).contains(at))
            .map(|(_, at)| *at)
            .collect())
    }

    async fn snapshots_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<JsonValue>> {
        Ok(self
            .snapshots
            .lock()
            .expect("snapshots lock")
            .iter()
            .filter(|((s, at), _)| s == symbol && (start..=end).contains(at))
            .map(|(_, data)| data.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use zero_dte_core::InstrumentKind;

    fn position(symbol: &str) -> PositionRecord {
        PositionRecord {
            symbol: symbol.to_string(),
            kind: InstrumentKind::Put,
            quantity: dec!(-1),
            purchase_price: dec!(1.50),
            sell_price: None,
            created: Utc::now(),
            closed: None,
        }
    }

    #[tokio::test]
    async fn close_sets_exit_exactly_once() {
        let store = InMemoryStore::new();
        store.save(&position("QQQ 250616P00500000")).await.unwrap();

        let when = Utc::now();
        store
            .close("QQQ 250616P00500000", Some(dec!(0.10)), when)
            .await
            .unwrap();

        assert!(store.find_open().await.unwrap().is_empty());
        let closed = store.find_closed_since(when).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].sell_price, Some(dec!(0.10)));
    }

    #[tokio::test]
    async fn unfilled_legs_exclude_marked_orders() {
        let store = InMemoryStore::new();
        let leg = OrderLegRecord {
            order_id: 9,
            symbol: "QQQ 250616C00530000".to_string(),
            kind: InstrumentKind::Call,
            quantity: dec!(-1),
            created: Utc::now(),
            filled: None,
        };
        store.save_leg(&leg).await.unwrap();
        assert_eq!(store.find_unfilled_legs().await.unwrap().len(), 1);

        store.mark_filled(9, Utc::now()).await.unwrap();
        assert!(store.find_unfilled_legs().await.unwrap().is_empty());
    }
}
