//! Brokerage option symbol parsing.
//!
//! Option symbols pack underlying (up to 6 chars, space padded), `yyMMdd`
//! expiration, C/P flag, and the strike as a 6-8 digit integer in
//! thousandths: `XYZ 210115C00050000` is the XYZ 2021-01-15 50.000 call.
//! Symbols that do not match the pattern are plain equity tickers.

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Call,
    Put,
    Equity,
}

impl InstrumentKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
            Self::Equity => "equity",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "call" => Some(Self::Call),
            "put" => Some(Self::Put),
            "equity" => Some(Self::Equity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickerSymbol {
    /// The raw brokerage symbol.
    pub symbol: String,
    pub underlying: String,
    pub kind: InstrumentKind,
    pub expiration: Option<NaiveDate>,
    /// Absent for equity symbols. Three decimal places.
    pub strike: Option<Decimal>,
}

fn option_symbol_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{1,6})\s*?(\d{6})([CP])(\d{6,8})$").expect("valid symbol regex")
    })
}

impl TickerSymbol {
    /// Parses a brokerage symbol. Non-option symbols come back as equities
    /// with no strike or expiration.
    #[must_use]
    pub fn parse(symbol: &str) -> Option<Self> {
        if symbol.is_empty() {
            return None;
        }
        let Some(parts) = option_symbol_regex().captures(symbol) else {
            return Some(Self {
                symbol: symbol.to_string(),
                underlying: symbol.to_string(),
                kind: InstrumentKind::Equity,
                expiration: None,
                strike: None,
            });
        };

        let expiration = NaiveDate::parse_from_str(&parts[2], "%y%m%d").ok()?;
        let kind = if &parts[3] == "C" {
            InstrumentKind::Call
        } else {
            InstrumentKind::Put
        };
        let strike = (Decimal::from_str(&parts[4]).ok()? / Decimal::from(1000))
            .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);

        Some(Self {
            symbol: symbol.to_string(),
            underlying: parts[1].to_string(),
            kind,
            expiration: Some(expiration),
            strike: Some(strike),
        })
    }
}

impl std::fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_call_symbol() {
        let parsed = TickerSymbol::parse("XYZ 210115C00050000").unwrap();
        assert_eq!(parsed.underlying, "XYZ");
        assert_eq!(parsed.kind, InstrumentKind::Call);
        assert_eq!(
            parsed.expiration,
            Some(NaiveDate::from_ymd_opt(2021, 1, 15).unwrap())
        );
        assert_eq!(parsed.strike, Some(dec!(50.000)));
    }

    #[test]
    fn parses_put_symbol_with_fractional_strike() {
        let parsed = TickerSymbol::parse("QQQ 210215P00050250").unwrap();
        assert_eq!(parsed.underlying, "QQQ");
        assert_eq!(parsed.kind, InstrumentKind::Put);
        assert_eq!(
            parsed.expiration,
            Some(NaiveDate::from_ymd_opt(2021, 2, 15).unwrap())
        );
        assert_eq!(parsed.strike, Some(dec!(50.250)));
    }

    #[test]
    fn equity_symbol_has_no_strike() {
        let parsed = TickerSymbol::parse("SPY").unwrap();
        assert_eq!(parsed.kind, InstrumentKind::Equity);
        assert_eq!(parsed.underlying, "SPY");
        assert!(parsed.strike.is_none());
        assert!(parsed.expiration.is_none());
    }

    #[test]
    fn empty_symbol_is_rejected() {
        assert!(TickerSymbol::parse("").is_none());
    }
}
