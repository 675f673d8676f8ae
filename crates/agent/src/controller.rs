//! The strategy state machine, one transition per timer tick.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use zero_dte_core::clock::{Clock, MARKET_TZ};
use zero_dte_core::config::AgentConfig;
use zero_dte_core::ticker::{InstrumentKind, TickerSymbol};
use zero_dte_data::{OrderLegRecord, OrderStore, PositionRecord, PositionStore, QuoteStore};
use zero_dte_schwab::{BrokerGateway, OrderStatus, OrderTicket};

use crate::condor::{build_iron_condor_order, select_iron_condor};
use crate::monitor::PositionMonitor;

/// Session state owned by the controller and touched only from its tick.
/// The controller itself is the single-flight guard: it lives inside one
/// task and ticks sequentially, so two ticks can never interleave.
#[derive(Debug, Default)]
pub struct StrategyState {
    /// Brokerage id of the outstanding opening order.
    pub pending_order_id: Option<i64>,
    /// Mid prices captured when the pending order was assembled; entry
    /// prices for the positions once the fill confirms.
    pub pending_leg_prices: HashMap<String, Decimal>,
    /// Symbols of the legs currently held.
    pub open: HashSet<String>,
    /// Symbols already exited this session. A non-empty closed set means
    /// the session traded and no further condor is opened today.
    pub closed: HashSet<String>,
}

impl StrategyState {
    fn session_idle(&self) -> bool {
        self.open.is_empty() && self.closed.is_empty()
    }
}

/// Drives one trading session: open a condor inside the morning window,
/// poll the order to a fill, then monitor the position to an exit.
pub struct StrategyController {
    broker: Arc<dyn BrokerGateway>,
    orders: Arc<dyn OrderStore>,
    positions: Arc<dyn PositionStore>,
    clock: Arc<dyn Clock>,
    config: AgentConfig,
    monitor: PositionMonitor,
    state: StrategyState,
}

impl StrategyController {
    #[must_use]
    pub fn new(
        broker: Arc<dyn BrokerGateway>,
        orders: Arc<dyn OrderStore>,
        positions: Arc<dyn PositionStore>,
        quotes: Arc<dyn QuoteStore>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Self {
        let monitor = PositionMonitor::new(
            broker.clone(),
            positions.clone(),
            quotes,
            clock.clone(),
            config.clone(),
        );
        Self {
            broker,
            orders,
            positions,
            clock,
            config,
            monitor,
            state: StrategyState::default(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    /// Rebuilds session state from the stores after a restart. Persisted
    /// records are the source of truth; in-memory state is a cache.
    ///
    /// # Errors
    /// Returns an error when a store read fails.
    pub async fn rehydrate(&mut self) -> Result<()> {
        for record in self.positions.find_open().await? {
            self.state.open.insert(record.symbol);
        }
        for record in self.positions.find_closed_since(self.session_start()).await? {
            self.state.closed.insert(record.symbol);
        }

        let unfilled = self.orders.find_unfilled_legs().await?;
        let ids = distinct_order_ids(&unfilled);
        match ids.as_slice() {
            [] => {}
            [id] => self.state.pending_order_id = Some(*id),
            _ => error!(?ids, "Multiple unfilled orders found at startup; not resuming any"),
        }
        info!(
            open = self.state.open.len(),
            closed = self.state.closed.len(),
            pending = ?self.state.pending_order_id,
            "Rehydrated session state"
        );
        Ok(())
    }

    /// One state-machine transition against the current market-local time.
    ///
    /// # Errors
    /// Returns an error when a brokerage call or store write fails; state
    /// is only mutated after the corresponding I/O succeeded, so a failed
    /// tick is safe to retry on the next interval.
    pub async fn tick(&mut self) -> Result<()> {
        let now = self.clock.now_market().time();
        if now < self.config.trade_open || now >= self.config.close_time {
            return Ok(());
        }

        if now < self.config.opening_window_end && self.state.session_idle() {
            match self.state.pending_order_id {
                None => self.open_condor().await,
                Some(id) => self.poll_pending(id).await,
            }
        } else if !self.state.open.is_empty() {
            self.monitor.evaluate(&mut self.state).await
        } else {
            Ok(())
        }
    }

    /// Selects legs by the configured deltas and submits the opening order.
    /// At most one placement attempt per tick.
    async fn open_condor(&mut self) -> Result<()> {
        let today = self.clock.now_market().date_naive();
        let chain = self
            .broker
            .fetch_option_chain(&self.config.symbol, today, today)
            .await?;
        let legs = match select_iron_condor(&chain, &self.config) {
            Ok(legs) => legs,
            Err(e) => {
                warn!(symbol = %self.config.symbol, error = %e, "No qualifying condor this tick");
                return Ok(());
            }
        };
        let ticket = build_iron_condor_order(&legs, self.config.quantity);

        let order_id = if self.config.simulated {
            simulated_order_id()
        } else {
            self.broker.place_order(&ticket).await?
        };
        info!(
            order_id,
            symbol = %self.config.symbol,
            order_type = ?ticket.order_type,
            simulated = self.config.simulated,
            "Opened iron condor order"
        );
        // A live order exists from here on. The pending marker must be set
        // before any store write, so a failed persistence tick resumes as a
        // poll instead of a second placement.
        self.state.pending_order_id = Some(order_id);
        self.state.pending_leg_prices = legs
            .quotes()
            .iter()
            .map(|quote| (quote.symbol.clone(), quote.mid()))
            .collect();

        let created = self.clock.now_utc();
        let records = leg_records(order_id, &ticket, created);
        for record in &records {
            self.orders.save_leg(record).await?;
        }

        if self.config.simulated {
            // Simulated fills are immediate; no brokerage round trip.
            self.confirm_fill(order_id, &records, created).await?;
        }
        Ok(())
    }

    /// Checks the pending order against the brokerage and the persisted
    /// unfilled legs. Anything other than exactly one matching order id in
    /// the store is an inconsistency: log it and abandon the tick.
    async fn poll_pending(&mut self, pending_id: i64) -> Result<()> {
        let unfilled = self.orders.find_unfilled_legs().await?;
        let ids = distinct_order_ids(&unfilled);
        if ids != [pending_id] {
            error!(
                ?ids,
                pending_id, "Unfilled order records do not resolve to the pending order; abandoning tick"
            );
            return Ok(());
        }

        let order = self.broker.fetch_order(pending_id).await?;
        match order.status {
            OrderStatus::Pending => Ok(()),
            OrderStatus::Filled => {
                let filled_at = order.filled_at.unwrap_or_else(|| self.clock.now_utc());
                self.confirm_fill(pending_id, &unfilled, filled_at).await
            }
            OrderStatus::Cancelled => {
                warn!(pending_id, "Opening order cancelled by the brokerage");
                self.state.pending_order_id = None;
                self.state.pending_leg_prices.clear();
                Ok(())
            }
        }
    }

    /// Stamps the fill and materializes one open position per leg.
    async fn confirm_fill(
        &mut self,
        order_id: i64,
        legs: &[OrderLegRecord],
        filled_at: DateTime<Utc>,
    ) -> Result<()> {
        self.orders.mark_filled(order_id, filled_at).await?;
        for leg in legs {
            let purchase_price = self.entry_price(&leg.symbol).await;
            self.positions
                .save(&PositionRecord {
                    symbol: leg.symbol.clone(),
                    kind: leg.kind,
                    quantity: leg.quantity,
                    purchase_price,
                    sell_price: None,
                    created: filled_at,
                    closed: None,
                })
                .await?;
            self.state.open.insert(leg.symbol.clone());
        }
        info!(order_id, legs = legs.len(), "Order filled, positions open");
        self.state.pending_order_id = None;
        self.state.pending_leg_prices.clear();
        Ok(())
    }

    /// Entry price for a filled leg: the mid captured at placement, or the
    /// live mark when the placement predates this process.
    async fn entry_price(&self, symbol: &str) -> Decimal {
        if let Some(price) = self.state.pending_leg_prices.get(symbol) {
            return *price;
        }
        match self.broker.fetch_quote(symbol).await {
            Ok(quote) => quote.mark,
            Err(e) => {
                warn!(symbol, error = %e, "No entry price available; recording zero");
                Decimal::ZERO
            }
        }
    }

    /// Start of the current session as a UTC instant (market-local
    /// midnight).
    fn session_start(&self) -> DateTime<Utc> {
        let midnight = self.clock.now_market().date_naive().and_time(NaiveTime::MIN);
        midnight
            .and_local_timezone(MARKET_TZ)
            .earliest()
            .map_or_else(
                || self.clock.now_utc() - chrono::Duration::hours(24),
                |local| local.with_timezone(&Utc),
            )
    }
}

fn leg_records(order_id: i64, ticket: &OrderTicket, created: DateTime<Utc>) -> Vec<OrderLegRecord> {
    ticket
        .legs
        .iter()
        .map(|leg| OrderLegRecord {
            order_id,
            symbol: leg.symbol.clone(),
            kind: TickerSymbol::parse(&leg.symbol)
                .map_or(InstrumentKind::Equity, |ticker| ticker.kind),
            quantity: leg.quantity,
            created,
            filled: None,
        })
        .collect()
}

fn distinct_order_ids(legs: &[OrderLegRecord]) -> Vec<i64> {
    let mut ids: Vec<i64> = legs.iter().map(|leg| leg.order_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn simulated_order_id() -> i64 {
    rand::thread_rng().gen_range(1..=i64::MAX)
}
