use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zero_dte_schwab::OptionQuote;

/// Per-strike GEX aggregate, built incrementally while scanning a contract
/// stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrikeGex {
    pub strike: Decimal,
    pub call_gex: Decimal,
    pub put_gex: Decimal,
    /// `call_gex + put_gex`.
    pub total_gex: Decimal,
    pub open_interest: Decimal,
    pub call_volume: Decimal,
    pub put_volume: Decimal,
    /// Raw contracts, retained only when detail suppression is off.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<OptionQuote>,
}

impl StrikeGex {
    #[must_use]
    pub fn new(strike: Decimal) -> Self {
        Self {
            strike,
            call_gex: Decimal::ZERO,
            put_gex: Decimal::ZERO,
            total_gex: Decimal::ZERO,
            open_interest: Decimal::ZERO,
            call_volume: Decimal::ZERO,
            put_volume: Decimal::ZERO,
            contracts: Vec::new(),
        }
    }

    /// True when every aggregate is exactly zero; such strikes are pruned
    /// to keep the map sparse.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.call_gex.is_zero() && self.put_gex.is_zero() && self.total_gex.is_zero()
    }
}

/// Aggregate gamma exposure for one underlying at one instant.
///
/// Immutable after construction. Walls and flip point default to zero when
/// no qualifying strike exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TotalGex {
    /// Per-strike aggregates; iterate with [`TotalGex::strikes_desc`] for
    /// the strike-descending order the flip-point scan uses.
    pub per_strike: BTreeMap<Decimal, StrikeGex>,
    pub total_call_gex: Decimal,
    pub total_put_gex: Decimal,
    pub total_gex: Decimal,
    /// Strike with the maximum aggregate GEX strictly above spot.
    pub call_wall: Decimal,
    /// Strike with the most negative aggregate GEX at or below spot.
    pub put_wall: Decimal,
    /// Price level where aggregate GEX changes sign, one decimal.
    pub flip_point: Decimal,
}

impl TotalGex {
    /// Per-strike aggregates ordered by descending strike.
    pub fn strikes_desc(&self) -> impl Iterator<Item = &StrikeGex> {
        self.per_strike.values().rev()
    }
}
