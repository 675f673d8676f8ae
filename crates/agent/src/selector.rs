//! Delta-nearest option leg selection.

use rust_decimal::Decimal;

use zero_dte_schwab::OptionQuote;

/// Returns the contract whose delta is numerically closest to `target`.
///
/// Contracts with a delta of exactly zero are treated as stale or untraded
/// strikes and never selected, even when zero is the nearest value. Ties go
/// to the earlier contract in the list.
#[must_use]
pub fn find_contract<'a>(contracts: &'a [OptionQuote], target: Decimal) -> Option<&'a OptionQuote> {
    contracts
        .iter()
        .filter(|c| !c.delta.is_zero())
        .min_by_key(|c| (c.delta - target).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use zero_dte_schwab::OptionRight;

    fn put_with_delta(delta: Decimal) -> OptionQuote {
        OptionQuote {
            symbol: format!("QQQ 250616P00500000/{delta}"),
            underlying: "QQQ".to_string(),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            strike: dec!(500),
            right: OptionRight::Put,
            delta,
            gamma: dec!(0.01),
            open_interest: dec!(100),
            bid: dec!(1.00),
            ask: dec!(1.10),
            volume: dec!(50),
        }
    }

    #[test]
    fn picks_nearest_delta() {
        let contracts = vec![
            put_with_delta(dec!(-0.10)),
            put_with_delta(dec!(-0.38)),
            put_with_delta(dec!(-0.55)),
            put_with_delta(dec!(0)),
        ];
        let picked = find_contract(&contracts, dec!(-0.40)).unwrap();
        assert_eq!(picked.delta, dec!(-0.38));
    }

    #[test]
    fn never_picks_zero_delta() {
        // Zero is the trivially closest match for a small target.
        let contracts = vec![put_with_delta(dec!(0)), put_with_delta(dec!(-0.90))];
        let picked = find_contract(&contracts, dec!(-0.05)).unwrap();
        assert_eq!(picked.delta, dec!(-0.90));
    }

    #[test]
    fn empty_or_all_zero_yields_none() {
        assert!(find_contract(&[], dec!(-0.40)).is_none());
        let contracts = vec![put_with_delta(dec!(0))];
        assert!(find_contract(&contracts, dec!(-0.40)).is_none());
    }
}
