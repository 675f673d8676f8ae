//! Pure GEX aggregation over a stream of option-contract quotes.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use zero_dte_schwab::{OptionQuote, OptionRight};

use crate::types::{StrikeGex, TotalGex};

/// Signed per-contract exposure: `gamma × openInterest × spot × 100 × 0.01`,
/// negated for puts.
fn contract_gex(contract: &OptionQuote, spot: Decimal) -> Decimal {
    // 100-share contract multiplier, scaled per 1% underlying move.
    let exposure =
        contract.gamma * contract.open_interest * spot * Decimal::ONE_HUNDRED * Decimal::new(1, 2);
    match contract.right {
        OptionRight::Call => exposure,
        OptionRight::Put => -exposure,
    }
}

/// Aggregates a contract stream into a [`TotalGex`] snapshot.
///
/// The contracts are expected to be pre-filtered to the expirations of
/// interest. An empty stream yields an all-zero snapshot rather than an
/// error. When `suppress_details` is false, each per-strike entry retains
/// its raw contracts for detail responses.
pub fn compute_total_gex<'a, I>(contracts: I, spot: Decimal, suppress_details: bool) -> TotalGex
where
    I: IntoIterator<Item = &'a OptionQuote>,
{
    let mut result = TotalGex::default();
    // Aggregate GEX per strike on each side of spot, tracked as produced.
    let mut above_spot: HashMap<Decimal, Decimal> = HashMap::new();
    let mut below_spot: HashMap<Decimal, Decimal> = HashMap::new();

    for contract in contracts {
        let entry = result
            .per_strike
            .entry(contract.strike)
            .or_insert_with(|| StrikeGex::new(contract.strike));

        let exposure = contract_gex(contract, spot);
        match contract.right {
            OptionRight::Call => {
                entry.call_gex += exposure;
                entry.call_volume += contract.volume;
                result.total_call_gex += exposure;
            }
            OptionRight::Put => {
                entry.put_gex += exposure;
                entry.put_volume += contract.volume;
                result.total_put_gex += exposure;
            }
        }
        entry.open_interest += contract.open_interest;
        entry.total_gex = entry.call_gex + entry.put_gex;
        if !suppress_details {
            entry.contracts.push(contract.clone());
        }

        // Call wall candidates sit strictly above spot; put wall candidates
        // at or below spot.
        if contract.strike > spot {
            above_spot.insert(contract.strike, entry.total_gex);
        } else {
            below_spot.insert(contract.strike, entry.total_gex);
        }
    }

    result.per_strike.retain(|_, entry| !entry.is_zero());
    result.total_gex = result.total_call_gex + result.total_put_gex;

    // Strikes pruned for a zero aggregate are not wall candidates either.
    if let Some((strike, _)) = above_spot
        .into_iter()
        .filter(|(_, gex)| !gex.is_zero())
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
    {
        result.call_wall = strike;
    }
    if let Some((strike, _)) = below_spot
        .into_iter()
        .filter(|(_, gex)| !gex.is_zero())
        .min_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
    {
        result.put_wall = strike;
    }

    if let Some(flip) = find_flip_point(&result) {
        result.flip_point = flip;
    }

    result
}

/// Finds the price level where smoothed aggregate GEX changes sign.
///
/// Walks the strike-descending per-strike totals, builds the 2-point moving
/// average of each adjacent pair, and scans that averaged sequence for the
/// first strict sign change. The reported level is the midpoint of the
/// strike pair whose average precedes the change, floored to one decimal.
fn find_flip_point(total: &TotalGex) -> Option<Decimal> {
    let strikes: Vec<(Decimal, Decimal)> = total
        .strikes_desc()
        .map(|entry| (entry.strike, entry.total_gex))
        .collect();
    if strikes.len() < 2 {
        return None;
    }

    let averaged: Vec<(Decimal, Decimal, Decimal)> = strikes
        .windows(2)
        .map(|pair| {
            let (upper, upper_gex) = pair[0];
            let (lower, lower_gex) = pair[1];
            (upper, lower, (upper_gex + lower_gex) / Decimal::TWO)
        })
        .collect();

    averaged.windows(2).find_map(|pair| {
        let (upper, lower, previous) = pair[0];
        let (_, _, current) = pair[1];
        let crossed = (previous.is_sign_positive() && !previous.is_zero() && current < Decimal::ZERO)
            || (previous < Decimal::ZERO && current > Decimal::ZERO);
        crossed.then(|| {
            ((upper + lower) / Decimal::TWO)
                .round_dp_with_strategy(1, RoundingStrategy::ToNegativeInfinity)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn contract(
        strike: Decimal,
        right: OptionRight,
        gamma: Decimal,
        open_interest: Decimal,
    ) -> OptionQuote {
        let flag = match right {
            OptionRight::Call => "C",
            OptionRight::Put => "P",
        };
        OptionQuote {
            symbol: format!("QQQ 250616{flag}{strike}"),
            underlying: "QQQ".to_string(),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            strike,
            right,
            delta: dec!(0.3),
            gamma,
            open_interest,
            bid: dec!(1.00),
            ask: dec!(1.10),
            volume: dec!(50),
        }
    }

    #[test]
    fn computes_scenario_with_one_call_and_one_put() {
        let contracts = [
            contract(dec!(105), OptionRight::Call, dec!(0.05), dec!(1000)),
            contract(dec!(95), OptionRight::Put, dec!(0.04), dec!(800)),
        ];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);

        assert_eq!(total.total_call_gex, dec!(5000));
        assert_eq!(total.total_put_gex, dec!(-3200));
        assert_eq!(total.total_gex, dec!(1800));
        assert_eq!(total.call_wall, dec!(105));
        assert_eq!(total.put_wall, dec!(95));
    }

    #[test]
    fn empty_stream_yields_zero_snapshot() {
        let contracts: [OptionQuote; 0] = [];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);
        assert!(total.per_strike.is_empty());
        assert_eq!(total.total_gex, Decimal::ZERO);
        assert_eq!(total.call_wall, Decimal::ZERO);
        assert_eq!(total.put_wall, Decimal::ZERO);
        assert_eq!(total.flip_point, Decimal::ZERO);
    }

    #[test]
    fn total_gex_is_sum_of_per_strike_totals() {
        let contracts = [
            contract(dec!(110), OptionRight::Call, dec!(0.02), dec!(500)),
            contract(dec!(105), OptionRight::Call, dec!(0.05), dec!(1000)),
            contract(dec!(105), OptionRight::Put, dec!(0.01), dec!(300)),
            contract(dec!(95), OptionRight::Put, dec!(0.04), dec!(800)),
        ];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);

        let per_strike_sum: Decimal = total.per_strike.values().map(|e| e.total_gex).sum();
        assert_eq!(total.total_gex, per_strike_sum);
        assert_eq!(total.total_gex, total.total_call_gex + total.total_put_gex);
    }

    #[test]
    fn walls_respect_spot_sides() {
        let contracts = [
            contract(dec!(120), OptionRight::Call, dec!(0.01), dec!(100)),
            contract(dec!(110), OptionRight::Call, dec!(0.06), dec!(2000)),
            contract(dec!(100), OptionRight::Put, dec!(0.02), dec!(400)),
            contract(dec!(90), OptionRight::Put, dec!(0.05), dec!(1500)),
        ];
        let spot = dec!(100);
        let total = compute_total_gex(contracts.iter(), spot, true);

        assert!(total.call_wall > spot);
        assert!(total.put_wall <= spot);
        assert_eq!(total.call_wall, dec!(110));
        assert_eq!(total.put_wall, dec!(90));
    }

    #[test]
    fn strike_at_spot_belongs_to_put_wall_pool() {
        let contracts = [contract(dec!(100), OptionRight::Put, dec!(0.03), dec!(900))];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);
        assert_eq!(total.put_wall, dec!(100));
        assert_eq!(total.call_wall, Decimal::ZERO);
    }

    #[test]
    fn zero_aggregate_strikes_are_pruned() {
        let contracts = [
            contract(dec!(105), OptionRight::Call, dec!(0), dec!(1000)),
            contract(dec!(95), OptionRight::Put, dec!(0.04), dec!(800)),
        ];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);
        assert!(!total.per_strike.contains_key(&dec!(105)));
        assert!(total.per_strike.contains_key(&dec!(95)));
        // The pruned strike is not a wall either.
        assert_eq!(total.call_wall, Decimal::ZERO);
        assert_eq!(total.put_wall, dec!(95));
    }

    #[test]
    fn detects_flip_point_between_sign_change() {
        // Strike-descending totals: +5000, +3000, -1600, -4000.
        // Averages: +4000, +700, -2800; sign change between the 2nd and
        // 3rd average, whose leading window is (105, 100).
        let contracts = [
            contract(dec!(110), OptionRight::Call, dec!(0.05), dec!(1000)),
            contract(dec!(105), OptionRight::Call, dec!(0.03), dec!(1000)),
            contract(dec!(100), OptionRight::Put, dec!(0.02), dec!(800)),
            contract(dec!(95), OptionRight::Put, dec!(0.05), dec!(800)),
        ];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);
        assert_eq!(total.flip_point, dec!(102.5));
    }

    #[test]
    fn no_flip_point_when_signs_agree() {
        let contracts = [
            contract(dec!(110), OptionRight::Call, dec!(0.05), dec!(1000)),
            contract(dec!(105), OptionRight::Call, dec!(0.03), dec!(1000)),
            contract(dec!(100), OptionRight::Call, dec!(0.02), dec!(800)),
        ];
        let total = compute_total_gex(contracts.iter(), dec!(100), true);
        assert_eq!(total.flip_point, Decimal::ZERO);
    }

    #[test]
    fn contract_order_within_a_strike_does_not_change_aggregate() {
        let a = contract(dec!(105), OptionRight::Call, dec!(0.05), dec!(1000));
        let b = contract(dec!(105), OptionRight::Call, dec!(0.02), dec!(400));
        let c = contract(dec!(95), OptionRight::Put, dec!(0.04), dec!(800));

        let forward = compute_total_gex([&a, &b, &c].into_iter(), dec!(100), true);
        let reversed = compute_total_gex([&b, &a, &c].into_iter(), dec!(100), true);

        assert_eq!(forward.total_gex, reversed.total_gex);
        assert_eq!(forward.flip_point, reversed.flip_point);
        assert_eq!(
            forward.per_strike[&dec!(105)].call_gex,
            reversed.per_strike[&dec!(105)].call_gex
        );
    }

    #[test]
    fn details_retained_only_when_not_suppressed() {
        let contracts = [contract(dec!(95), OptionRight::Put, dec!(0.04), dec!(800))];
        let suppressed = compute_total_gex(contracts.iter(), dec!(100), true);
        let detailed = compute_total_gex(contracts.iter(), dec!(100), false);
        assert!(suppressed.per_strike[&dec!(95)].contracts.is_empty());
        assert_eq!(detailed.per_strike[&dec!(95)].contracts.len(), 1);
    }
}
