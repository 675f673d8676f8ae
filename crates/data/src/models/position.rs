use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zero_dte_core::InstrumentKind;

/// A position created when an order leg fills.
///
/// Open while `closed` and `sell_price` are null; both are set together
/// when the exit is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub kind: InstrumentKind,
    /// Net signed quantity: positive long, negative short.
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub sell_price: Option<Decimal>,
    pub created: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
}

impl PositionRecord {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }
}
