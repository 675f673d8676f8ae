//! Open-position monitoring and exit handling.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use zero_dte_core::clock::Clock;
use zero_dte_core::config::AgentConfig;
use zero_dte_data::{MarkRecord, PositionRecord, PositionStore, QuoteStore};
use zero_dte_schwab::{BrokerGateway, Instruction, OrderDuration, OrderLeg, OrderTicket, OrderType};

use crate::controller::StrategyState;

/// Watches the open condor legs and liquidates on a profit/loss threshold
/// or unconditionally inside the forced-close window before the session
/// deadline.
pub struct PositionMonitor {
    broker: Arc<dyn BrokerGateway>,
    positions: Arc<dyn PositionStore>,
    quotes: Arc<dyn QuoteStore>,
    clock: Arc<dyn Clock>,
    config: AgentConfig,
}

impl PositionMonitor {
    #[must_use]
    pub fn new(
        broker: Arc<dyn BrokerGateway>,
        positions: Arc<dyn PositionStore>,
        quotes: Arc<dyn QuoteStore>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Self {
        Self {
            broker,
            positions,
            quotes,
            clock,
            config,
        }
    }

    /// One monitoring pass over the open positions in `state`.
    ///
    /// The deadline check runs before any valuation: inside the forced-close
    /// window everything is liquidated at market regardless of profit.
    ///
    /// # Errors
    /// Returns an error when the closing order or a store write fails; the
    /// state is left untouched for the next tick to retry.
    pub async fn evaluate(&self, state: &mut StrategyState) -> Result<()> {
        let symbols: Vec<String> = state.open.iter().cloned().collect();
        let records = self.positions.find_open_by_symbols(&symbols).await?;
        if records.is_empty() {
            state.open.clear();
            return Ok(());
        }

        let now = self.clock.now_market().time();
        if now >= forced_close_start(&self.config) {
            info!("Forced-close window reached; liquidating all open positions");
            // Exit prices are still recorded when quotes are reachable; the
            // deadline itself never waits on them.
            let marks = match self.fetch_marks(&records).await {
                Ok(marks) => marks,
                Err(e) => {
                    warn!(error = %e, "Mark capture failed ahead of forced close");
                    HashMap::new()
                }
            };
            return self
                .close_all(state, &records, OrderType::Market, &marks)
                .await;
        }

        let marks = self.fetch_marks(&records).await?;
        let Some(pnl) = profit_percentage(&records, &marks) else {
            return Ok(());
        };
        debug!(%pnl, open = records.len(), "Valued open positions");

        if should_close(pnl, &self.config) {
            let limit = net_close_price(&records, &marks);
            info!(%pnl, %limit, "Exit threshold hit; closing positions at limit");
            self.close_all(state, &records, OrderType::Limit { price: limit }, &marks)
                .await
        } else {
            Ok(())
        }
    }

    /// Live marks for each record; a failed quote drops that leg from this
    /// tick's valuation instead of failing the pass.
    async fn fetch_marks(
        &self,
        records: &[PositionRecord],
    ) -> Result<HashMap<String, Decimal>> {
        let mut marks = HashMap::new();
        for record in records {
            match self.broker.fetch_quote(&record.symbol).await {
                Ok(quote) => {
                    self.quotes
                        .save_mark(&MarkRecord {
                            symbol: record.symbol.clone(),
                            mark: quote.mark,
                            created: self.clock.now_utc(),
                        })
                        .await?;
                    marks.insert(record.symbol.clone(), quote.mark);
                }
                Err(e) => {
                    warn!(symbol = %record.symbol, error = %e, "Quote unavailable; leg excluded from valuation this tick");
                }
            }
        }
        Ok(marks)
    }

    /// Submits one offsetting order for every record and records the exits.
    async fn close_all(
        &self,
        state: &mut StrategyState,
        records: &[PositionRecord],
        order_type: OrderType,
        marks: &HashMap<String, Decimal>,
    ) -> Result<()> {
        let legs: Vec<OrderLeg> = records
            .iter()
            .map(|record| OrderLeg {
                symbol: record.symbol.clone(),
                quantity: -record.quantity,
                instruction: if record.quantity < Decimal::ZERO {
                    Instruction::BuyToClose
                } else {
                    Instruction::SellToClose
                },
            })
            .collect();
        let ticket = OrderTicket {
            legs,
            order_type,
            duration: OrderDuration::Day,
            strategy: None,
            quantity: quantity_scale(records),
        };

        if self.config.simulated {
            info!(legs = ticket.legs.len(), "Simulated close, no order placed");
        } else {
            let order_id = self.broker.place_order(&ticket).await?;
            info!(order_id, legs = ticket.legs.len(), "Placed closing order");
        }

        let closed_at = self.clock.now_utc();
        for record in records {
            let sell_price = marks.get(&record.symbol).copied();
            self.positions
                .close(&record.symbol, sell_price, closed_at)
                .await?;
            state.open.remove(&record.symbol);
            state.closed.insert(record.symbol.clone());
        }
        Ok(())
    }
}

/// Start of the unconditional-liquidation window.
fn forced_close_start(config: &AgentConfig) -> NaiveTime {
    config.close_time - chrono::Duration::minutes(config.close_lead_minutes)
}

/// Profit fraction of the position set: `(purchase - current) / purchase`
/// over signed entry and mark values. Legs without a mark are excluded
/// entirely. `None` when nothing could be valued.
pub(crate) fn profit_percentage(
    records: &[PositionRecord],
    marks: &HashMap<String, Decimal>,
) -> Option<Decimal> {
    let mut purchase = Decimal::ZERO;
    let mut current = Decimal::ZERO;
    for record in records {
        let Some(mark) = marks.get(&record.symbol) else {
            continue;
        };
        purchase += record.purchase_price * record.quantity;
        current += *mark * record.quantity;
    }
    if purchase.is_zero() {
        return None;
    }
    Some((purchase - current) / purchase)
}

fn should_close(pnl: Decimal, config: &AgentConfig) -> bool {
    pnl >= config.profit_target_pct || pnl <= -config.loss_limit_pct
}

/// Per-spread net price to unwind the set at current marks, as a positive
/// limit, three decimals.
fn net_close_price(records: &[PositionRecord], marks: &HashMap<String, Decimal>) -> Decimal {
    let scale = quantity_scale(records);
    let net: Decimal = records
        .iter()
        .filter_map(|r| marks.get(&r.symbol).map(|mark| *mark * r.quantity))
        .sum();
    (net / scale)
        .abs()
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// The common per-leg contract count, as a positive quantity.
fn quantity_scale(records: &[PositionRecord]) -> Decimal {
    records
        .iter()
        .map(|r| r.quantity.abs())
        .max()
        .filter(|q| !q.is_zero())
        .unwrap_or(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use zero_dte_core::clock::FixedClock;
    use zero_dte_core::InstrumentKind;
    use zero_dte_data::InMemoryStore;
    use zero_dte_schwab::PaperBroker;

    fn record(symbol: &str, quantity: Decimal, purchase: Decimal) -> PositionRecord {
        PositionRecord {
            symbol: symbol.to_string(),
            kind: InstrumentKind::Put,
            quantity,
            purchase_price: purchase,
            sell_price: None,
            created: Utc.with_ymd_and_hms(2025, 6, 16, 14, 0, 0).unwrap(),
            closed: None,
        }
    }

    fn monitor_at(
        hour: u32,
        minute: u32,
        simulated: bool,
    ) -> (PositionMonitor, Arc<PaperBroker>, Arc<InMemoryStore>) {
        let broker = Arc::new(PaperBroker::new());
        let store = Arc::new(InMemoryStore::new());
        let config = AgentConfig {
            simulated,
            ..AgentConfig::default()
        };
        let monitor = PositionMonitor::new(
            broker.clone(),
            store.clone(),
            store.clone(),
            Arc::new(FixedClock::at_market(2025, 6, 16, hour, minute, 0)),
            config,
        );
        (monitor, broker, store)
    }

    #[test]
    fn thresholds_trigger_on_either_side() {
        let config = AgentConfig {
            profit_target_pct: dec!(0.90),
            loss_limit_pct: dec!(0.70),
            ..AgentConfig::default()
        };
        assert!(should_close(dec!(0.95), &config));
        assert!(should_close(dec!(-0.95), &config));
        assert!(!should_close(dec!(0.50), &config));
    }

    #[test]
    fn profit_percentage_handles_net_credit_positions() {
        // Short one leg at 2.00, now marked 0.10: 95% of the credit kept.
        let records = vec![record("SP", dec!(-1), dec!(2.00))];
        let marks = HashMap::from([("SP".to_string(), dec!(0.10))]);
        assert_eq!(profit_percentage(&records, &marks), Some(dec!(0.95)));
    }

    #[test]
    fn unquoted_legs_are_excluded_from_valuation() {
        let records = vec![
            record("SP", dec!(-1), dec!(2.00)),
            record("LP", dec!(1), dec!(0.50)),
        ];
        let marks = HashMap::from([("SP".to_string(), dec!(1.00))]);
        // Only SP is valued: (-2.00 - -1.00) / -2.00 = 0.5.
        assert_eq!(profit_percentage(&records, &marks), Some(dec!(0.5)));
        assert_eq!(profit_percentage(&records, &HashMap::new()), None);
    }

    #[tokio::test]
    async fn deadline_liquidates_at_market_regardless_of_profit() {
        let (monitor, broker, store) = monitor_at(14, 55, false);
        let mut state = StrategyState::default();
        for r in [
            record("SP", dec!(-1), dec!(2.00)),
            record("LP", dec!(1), dec!(0.50)),
        ] {
            store.save(&r).await.unwrap();
            state.open.insert(r.symbol.clone());
        }

        monitor.evaluate(&mut state).await.unwrap();

        assert_eq!(broker.placed_count(), 1);
        let order = &broker.recorded_orders()[0];
        assert_eq!(order.order_type, OrderType::Market);
        assert!(state.open.is_empty());
        assert_eq!(state.closed.len(), 2);
        assert!(store.find_open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn forced_close_records_reachable_exit_marks() {
        let (monitor, broker, store) = monitor_at(14, 55, false);
        let mut state = StrategyState::default();
        for r in [
            record("SP", dec!(-1), dec!(2.00)),
            record("LP", dec!(1), dec!(0.50)),
        ] {
            store.save(&r).await.unwrap();
            state.open.insert(r.symbol.clone());
        }
        // Only one leg has a live quote at the deadline.
        broker.set_mark("SP", dec!(0.50));

        monitor.evaluate(&mut state).await.unwrap();

        assert_eq!(broker.recorded_orders()[0].order_type, OrderType::Market);
        let closed = store
            .find_closed_since(Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap())
            .await
            .unwrap();
        let by_symbol: HashMap<_, _> = closed
            .into_iter()
            .map(|r| (r.symbol.clone(), r.sell_price))
            .collect();
        assert_eq!(by_symbol["SP"], Some(dec!(0.50)));
        assert_eq!(by_symbol["LP"], None);
    }

    #[tokio::test]
    async fn profit_target_closes_at_limit_with_offsetting_instructions() {
        let (monitor, broker, store) = monitor_at(10, 0, false);
        let mut state = StrategyState::default();
        for r in [
            record("SP", dec!(-1), dec!(2.00)),
            record("LP", dec!(1), dec!(0.05)),
        ] {
            store.save(&r).await.unwrap();
            state.open.insert(r.symbol.clone());
        }
        // Credit nearly fully decayed: pnl = (-1.95 - -0.04) / -1.95 ≈ 0.98.
        broker.set_mark("SP", dec!(0.05));
        broker.set_mark("LP", dec!(0.01));

        monitor.evaluate(&mut state).await.unwrap();

        assert_eq!(broker.placed_count(), 1);
        let order = &broker.recorded_orders()[0];
        assert_eq!(
            order.order_type,
            OrderType::Limit { price: dec!(0.04) }
        );
        let instructions: HashMap<_, _> = order
            .legs
            .iter()
            .map(|l| (l.symbol.clone(), l.instruction))
            .collect();
        assert_eq!(instructions["SP"], Instruction::BuyToClose);
        assert_eq!(instructions["LP"], Instruction::SellToClose);

        // Exits are recorded at the live marks.
        let closed = store
            .find_closed_since(Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(closed.len(), 2);
        assert!(closed.iter().all(|r| r.sell_price.is_some()));
    }

    #[tokio::test]
    async fn below_threshold_keeps_positions_open() {
        let (monitor, broker, store) = monitor_at(10, 0, false);
        let mut state = StrategyState::default();
        let r = record("SP", dec!(-1), dec!(2.00));
        store.save(&r).await.unwrap();
        state.open.insert(r.symbol);
        // Half the credit kept: pnl = 0.5, under the 0.9 target.
        broker.set_mark("SP", dec!(1.00));

        monitor.evaluate(&mut state).await.unwrap();

        assert_eq!(broker.placed_count(), 0);
        assert_eq!(store.find_open().await.unwrap().len(), 1);
        // The fetched mark was still recorded.
        assert_eq!(store.all_marks().len(), 1);
    }
}
