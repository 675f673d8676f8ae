use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A captured mark price. Every mark the agent fetches is recorded so the
/// reporting layer can replay intraday valuations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkRecord {
    pub symbol: String,
    pub mark: Decimal,
    pub created: DateTime<Utc>,
}
