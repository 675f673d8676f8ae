//! Brokerage data types shared by the strategy agent and the GEX engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Option contract right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionRight {
    Call,
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Immutable snapshot of one option contract from the market data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Full brokerage option symbol (e.g. `QQQ 250616C00530000`).
    pub symbol: String,
    pub underlying: String,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
    pub delta: Decimal,
    pub gamma: Decimal,
    pub open_interest: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume: Decimal,
}

impl OptionQuote {
    /// Midpoint of bid/ask, rounded half-up to 3 decimals.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        ((self.bid + self.ask) / Decimal::TWO)
            .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// An option chain already split by right, with the underlying spot price.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionChain {
    pub underlying: String,
    pub underlying_price: Decimal,
    pub calls: Vec<OptionQuote>,
    pub puts: Vec<OptionQuote>,
}

impl OptionChain {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() || self.puts.is_empty()
    }

    /// All contracts of both rights.
    pub fn contracts(&self) -> impl Iterator<Item = &OptionQuote> {
        self.calls.iter().chain(self.puts.iter())
    }
}

/// A single-instrument quote; `mark` is the live valuation price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub mark: Decimal,
    pub quote_time: DateTime<Utc>,
}

/// A position as reported by the brokerage account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPosition {
    pub symbol: String,
    pub average_price: Decimal,
    pub long_quantity: Decimal,
    pub short_quantity: Decimal,
}

impl AccountPosition {
    /// Net signed quantity: positive long, negative short.
    #[must_use]
    pub fn net_quantity(&self) -> Decimal {
        self.long_quantity - self.short_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_hash: String,
    pub positions: Vec<AccountPosition>,
}

/// Buy/sell, open/close instruction for one order leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDuration {
    Day,
    GoodTillCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexStrategy {
    IronCondor,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit { price: Decimal },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLeg {
    pub symbol: String,
    /// Signed contract count: negative for sells.
    pub quantity: Decimal,
    pub instruction: Instruction,
}

/// An order as assembled locally, before the brokerage assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTicket {
    pub legs: Vec<OrderLeg>,
    pub order_type: OrderType,
    pub duration: OrderDuration,
    pub strategy: Option<ComplexStrategy>,
    /// Net order quantity; negative for net-credit spreads.
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
}

/// An order as known to the brokerage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub order_id: i64,
    pub status: OrderStatus,
    pub legs: Vec<OrderLeg>,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub entered_at: Option<DateTime<Utc>>,
    pub filled_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mid_rounds_half_up_to_three_decimals() {
        let quote = OptionQuote {
            symbol: "QQQ 250616C00530000".to_string(),
            underlying: "QQQ".to_string(),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            strike: dec!(530),
            right: OptionRight::Call,
            delta: dec!(0.41),
            gamma: dec!(0.05),
            open_interest: dec!(1200),
            bid: dec!(1.23),
            ask: dec!(1.2345),
            volume: dec!(900),
        };
        // (1.23 + 1.2345) / 2 = 1.23225 -> 1.232
        assert_eq!(quote.mid(), dec!(1.232));
    }

    #[test]
    fn net_quantity_is_long_minus_short() {
        let position = AccountPosition {
            symbol: "QQQ 250616P00500000".to_string(),
            average_price: dec!(2.50),
            long_quantity: dec!(0),
            short_quantity: dec!(1),
        };
        assert_eq!(position.net_quantity(), dec!(-1));
    }
}
