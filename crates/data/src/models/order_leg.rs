use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zero_dte_core::InstrumentKind;

/// One leg of a submitted strategy order, persisted at placement and
/// stamped when the brokerage reports the fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLegRecord {
    /// Brokerage order id shared by all legs of one order.
    pub order_id: i64,
    /// Full option symbol of the leg instrument.
    pub symbol: String,
    pub kind: InstrumentKind,
    /// Signed contract count: negative for sells.
    pub quantity: Decimal,
    pub created: DateTime<Utc>,
    /// Null while the order is outstanding.
    pub filled: Option<DateTime<Utc>>,
}
