//! Iron condor leg selection and order assembly.

use rust_decimal::Decimal;
use thiserror::Error;

use zero_dte_core::config::AgentConfig;
use zero_dte_schwab::{
    ComplexStrategy, Instruction, OptionChain, OptionQuote, OrderDuration, OrderLeg, OrderTicket,
    OrderType,
};

use crate::selector::find_contract;

#[derive(Debug, Error)]
pub enum CondorError {
    #[error("option chain for {0} has no contracts")]
    EmptyChain(String),
    #[error("no {leg} contract near delta {target}")]
    LegNotFound { leg: &'static str, target: Decimal },
}

/// The four legs of an iron condor. Short legs are sold, long legs bought,
/// all at the same quantity.
#[derive(Debug, Clone)]
pub struct IronCondorLegs {
    pub short_put: OptionQuote,
    pub long_put: OptionQuote,
    pub short_call: OptionQuote,
    pub long_call: OptionQuote,
}

impl IronCondorLegs {
    /// Net mid price of the condor. Negative for a net credit, which is the
    /// normal case when the short deltas are larger than the long ones.
    #[must_use]
    pub fn net_limit_price(&self) -> Decimal {
        (self.long_put.mid() - self.short_put.mid()) + (self.long_call.mid() - self.short_call.mid())
    }

    /// Leg quotes in order: short put, long put, short call, long call.
    pub fn quotes(&self) -> [&OptionQuote; 4] {
        [
            &self.short_put,
            &self.long_put,
            &self.short_call,
            &self.long_call,
        ]
    }
}

/// Selects the four condor legs from `chain` by the configured target
/// deltas. All-or-nothing: a missing leg fails the whole selection.
///
/// # Errors
/// [`CondorError::EmptyChain`] when either side of the chain is empty,
/// [`CondorError::LegNotFound`] when a target delta has no non-zero match.
pub fn select_iron_condor(
    chain: &OptionChain,
    config: &AgentConfig,
) -> Result<IronCondorLegs, CondorError> {
    if chain.is_empty() {
        return Err(CondorError::EmptyChain(chain.underlying.clone()));
    }
    let leg = |contracts: &[OptionQuote], name, target| {
        find_contract(contracts, target)
            .cloned()
            .ok_or(CondorError::LegNotFound { leg: name, target })
    };
    Ok(IronCondorLegs {
        short_put: leg(&chain.puts, "short put", config.put_short_delta)?,
        long_put: leg(&chain.puts, "long put", config.put_long_delta)?,
        short_call: leg(&chain.calls, "short call", config.call_short_delta)?,
        long_call: leg(&chain.calls, "long call", config.call_long_delta)?,
    })
}

/// Assembles the opening order: sell-to-open the short legs, buy-to-open
/// the long legs, limit at the net mid price. The ticket's net quantity is
/// the negative of `quantity`, the sign convention for a net-credit spread.
#[must_use]
pub fn build_iron_condor_order(legs: &IronCondorLegs, quantity: Decimal) -> OrderTicket {
    let leg = |quote: &OptionQuote, instruction, signed_quantity| OrderLeg {
        symbol: quote.symbol.clone(),
        quantity: signed_quantity,
        instruction,
    };
    OrderTicket {
        legs: vec![
            leg(&legs.short_put, Instruction::SellToOpen, -quantity),
            leg(&legs.long_put, Instruction::BuyToOpen, quantity),
            leg(&legs.short_call, Instruction::SellToOpen, -quantity),
            leg(&legs.long_call, Instruction::BuyToOpen, quantity),
        ],
        order_type: OrderType::Limit {
            price: legs.net_limit_price(),
        },
        duration: OrderDuration::Day,
        strategy: Some(ComplexStrategy::IronCondor),
        quantity: -quantity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use zero_dte_schwab::OptionRight;

    fn contract(right: OptionRight, strike: Decimal, delta: Decimal, bid: Decimal) -> OptionQuote {
        let flag = match right {
            OptionRight::Call => 'C',
            OptionRight::Put => 'P',
        };
        OptionQuote {
            symbol: format!("QQQ 250616{flag}{:08}", (strike * dec!(1000)).trunc()),
            underlying: "QQQ".to_string(),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            strike,
            right,
            delta,
            gamma: dec!(0.01),
            open_interest: dec!(100),
            bid,
            ask: bid + dec!(0.10),
            volume: dec!(50),
        }
    }

    fn sample_chain() -> OptionChain {
        OptionChain {
            underlying: "QQQ".to_string(),
            underlying_price: dec!(500),
            calls: vec![
                contract(OptionRight::Call, dec!(505), dec!(0.41), dec!(2.00)),
                contract(OptionRight::Call, dec!(515), dec!(0.11), dec!(0.50)),
                contract(OptionRight::Call, dec!(525), dec!(0), dec!(0.05)),
            ],
            puts: vec![
                contract(OptionRight::Put, dec!(495), dec!(-0.39), dec!(2.20)),
                contract(OptionRight::Put, dec!(485), dec!(-0.09), dec!(0.40)),
                contract(OptionRight::Put, dec!(475), dec!(0), dec!(0.05)),
            ],
        }
    }

    #[test]
    fn selects_all_four_legs_by_delta() {
        let legs = select_iron_condor(&sample_chain(), &AgentConfig::default()).unwrap();
        assert_eq!(legs.short_put.delta, dec!(-0.39));
        assert_eq!(legs.long_put.delta, dec!(-0.09));
        assert_eq!(legs.short_call.delta, dec!(0.41));
        assert_eq!(legs.long_call.delta, dec!(0.11));
    }

    #[test]
    fn selection_is_all_or_nothing() {
        let mut chain = sample_chain();
        // Only the zero-delta call remains on the call side.
        chain.calls.retain(|c| c.delta.is_zero());
        let err = select_iron_condor(&chain, &AgentConfig::default()).unwrap_err();
        assert!(matches!(err, CondorError::LegNotFound { .. }));
    }

    #[test]
    fn empty_chain_is_rejected() {
        let mut chain = sample_chain();
        chain.puts.clear();
        let err = select_iron_condor(&chain, &AgentConfig::default()).unwrap_err();
        assert!(matches!(err, CondorError::EmptyChain(_)));
    }

    #[test]
    fn order_has_net_credit_limit_and_negative_quantity() {
        let legs = select_iron_condor(&sample_chain(), &AgentConfig::default()).unwrap();
        let ticket = build_iron_condor_order(&legs, dec!(2));

        // Mids: short put 2.25, long put 0.45, short call 2.05, long call 0.55.
        // (0.45 - 2.25) + (0.55 - 2.05) = -3.30.
        assert_eq!(
            ticket.order_type,
            OrderType::Limit {
                price: dec!(-3.30)
            }
        );
        assert_eq!(ticket.quantity, dec!(-2));
        assert_eq!(ticket.strategy, Some(ComplexStrategy::IronCondor));

        let quantities: Vec<_> = ticket
            .legs
            .iter()
            .map(|l| (l.instruction, l.quantity))
            .collect();
        assert_eq!(
            quantities,
            vec![
                (Instruction::SellToOpen, dec!(-2)),
                (Instruction::BuyToOpen, dec!(2)),
                (Instruction::SellToOpen, dec!(-2)),
                (Instruction::BuyToOpen, dec!(2)),
            ]
        );
    }
}
