//! Scheduled GEX capture and on-demand computation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use serde_json::Value as JsonValue;
use tracing::{error, info};

use zero_dte_core::clock::Clock;
use zero_dte_core::config::GexConfig;
use zero_dte_data::GexSnapshotStore;
use zero_dte_schwab::BrokerGateway;

use crate::engine::compute_total_gex;
use crate::types::TotalGex;

pub struct GexService {
    broker: Arc<dyn BrokerGateway>,
    store: Arc<dyn GexSnapshotStore>,
    clock: Arc<dyn Clock>,
    config: GexConfig,
}

impl GexService {
    #[must_use]
    pub fn new(
        broker: Arc<dyn BrokerGateway>,
        store: Arc<dyn GexSnapshotStore>,
        clock: Arc<dyn Clock>,
        config: GexConfig,
    ) -> Self {
        Self {
            broker,
            store,
            clock,
            config,
        }
    }

    /// Computes the GEX snapshot for `symbol` over the requested
    /// expirations; with no expirations given, today's contracts are used.
    ///
    /// # Errors
    /// Returns an error when the option chain cannot be fetched.
    pub async fn compute_gamma_exposure(
        &self,
        symbol: &str,
        expirations: Option<Vec<NaiveDate>>,
        suppress_details: bool,
    ) -> Result<TotalGex> {
        let today = self.clock.now_market().date_naive();
        let mut dates = expirations.unwrap_or_default();
        if dates.is_empty() {
            dates.push(today);
        }
        dates.sort_unstable();
        let from = dates[0];
        let to = dates[dates.len() - 1];

        let chain = self.broker.fetch_option_chain(symbol, from, to).await?;
        let contracts: Vec<_> = chain
            .contracts()
            .filter(|contract| dates.contains(&contract.expiration))
            .collect();

        Ok(compute_total_gex(
            contracts.into_iter(),
            chain.underlying_price,
            suppress_details,
        ))
    }

    pub async fn fetch_expiration_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>> {
        Ok(self.broker.fetch_expiration_dates(symbol).await?)
    }

    /// One watchlist sweep: compute a suppressed-detail snapshot per symbol
    /// and persist it. A failing symbol is logged and skipped.
    pub async fn capture_watchlist(&self) {
        for symbol in &self.config.watchlist {
            match self.capture_symbol(symbol).await {
                Ok(()) => info!(symbol, "Saved GEX snapshot"),
                Err(e) => error!(symbol, error = %e, "GEX capture failed"),
            }
        }
    }

    async fn capture_symbol(&self, symbol: &str) -> Result<()> {
        let total = self.compute_gamma_exposure(symbol, None, true).await?;
        let data = serde_json::to_value(&total)?;
        self.store
            .save_snapshot(symbol, self.clock.now_utc(), &data)
            .await
    }

    /// Drives the capture sweep on its configured interval during market
    /// hours (08-15 market time, Mon-Fri).
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.capture_interval_secs,
            watchlist = ?self.config.watchlist,
            "GEX capture service started"
        );
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.capture_interval_secs));
        loop {
            interval.tick().await;
            if self.in_capture_window() {
                self.capture_watchlist().await;
            }
        }
    }

    fn in_capture_window(&self) -> bool {
        let now = self.clock.now_market();
        let weekday = now.weekday();
        let is_weekday = !matches!(weekday, Weekday::Sat | Weekday::Sun);
        is_weekday && (8..=15).contains(&now.hour())
    }

    /// Most recent persisted snapshot for `symbol`.
    pub async fn latest_snapshot(&self, symbol: &str) -> Result<Option<JsonValue>> {
        self.store.latest_snapshot(symbol).await
    }

    /// Capture timestamps for `symbol` in `[start, end]`.
    pub async fn capture_times(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        self.store.capture_times(symbol, start, end).await
    }

    /// Persisted snapshots for `symbol` in `[start, end]`.
    pub async fn snapshots_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<JsonValue>> {
        self.store.snapshots_between(symbol, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use zero_dte_core::clock::FixedClock;
    use zero_dte_data::InMemoryStore;
    use zero_dte_schwab::{OptionChain, OptionQuote, OptionRight, PaperBroker};

    fn chain_for(date: NaiveDate) -> OptionChain {
        let call = OptionQuote {
            symbol: "QQQ 250616C00105000".to_string(),
            underlying: "QQQ".to_string(),
            expiration: date,
            strike: dec!(105),
            right: OptionRight::Call,
            delta: dec!(0.40),
            gamma: dec!(0.05),
            open_interest: dec!(1000),
            bid: dec!(1.00),
            ask: dec!(1.10),
            volume: dec!(100),
        };
        let mut stale_call = call.clone();
        stale_call.expiration = date + chrono::Duration::days(7);
        let put = OptionQuote {
            symbol: "QQQ 250616P00095000".to_string(),
            underlying: "QQQ".to_string(),
            expiration: date,
            strike: dec!(95),
            right: OptionRight::Put,
            delta: dec!(-0.40),
            gamma: dec!(0.04),
            open_interest: dec!(800),
            bid: dec!(1.00),
            ask: dec!(1.10),
            volume: dec!(100),
        };
        OptionChain {
            underlying: "QQQ".to_string(),
            underlying_price: dec!(100),
            calls: vec![call, stale_call],
            puts: vec![put],
        }
    }

    fn service_with(watchlist: Vec<String>) -> (GexService, Arc<InMemoryStore>) {
        let clock = FixedClock::at_market(2025, 6, 16, 9, 0, 0);
        let today = clock.now_market().date_naive();
        let broker = PaperBroker::new();
        broker.set_chain(chain_for(today));
        let store = Arc::new(InMemoryStore::new());
        let service = GexService::new(
            Arc::new(broker),
            store.clone(),
            Arc::new(clock),
            GexConfig {
                watchlist,
                capture_interval_secs: 60,
            },
        );
        (service, store)
    }

    #[tokio::test]
    async fn compute_defaults_to_today_and_filters_other_expirations() {
        let (service, _) = service_with(vec!["QQQ".to_string()]);
        let total = service
            .compute_gamma_exposure("QQQ", None, true)
            .await
            .unwrap();
        // The week-out call must not contribute.
        assert_eq!(total.total_call_gex, dec!(5000));
        assert_eq!(total.total_put_gex, dec!(-3200));
    }

    #[tokio::test]
    async fn capture_persists_one_snapshot_per_watchlist_symbol() {
        let (service, store) = service_with(vec!["QQQ".to_string()]);
        service.capture_watchlist().await;
        let snapshot = store.latest_snapshot("QQQ").await.unwrap().unwrap();
        let total: Decimal = serde_json::from_value(snapshot["total_gex"].clone()).unwrap();
        assert_eq!(total, dec!(1800));
    }
}
