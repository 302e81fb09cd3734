// src/strategies/ratchet.rs
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::core::session::Session;
use crate::strategies::traits::Strategy;
use crate::types::{Decision, Position, ReserveEffect, Side};
use crate::utils::format::{bare_pct, signed_pct};

/// Sell-high / buy-low ratchet over a single instrument.
///
/// When the price has gained `gain_threshold` over the session reference and
/// no reserve is outstanding, a `sell_fraction` slice of the position is sold
/// into cash. When the price has lost `loss_threshold` against the same
/// reference and a reserve exists, the whole reserve is redeployed. The two
/// branches are mutually exclusive, so at most one trade fires per
/// evaluation.
///
/// The sell size scales with the position (floor, minimum one share): larger
/// positions shed more shares per gain event. That ratchet is intentional.
pub struct ThresholdRatchet {
    gain_threshold: Decimal,
    loss_threshold: Decimal,
    sell_fraction: Decimal,
}

impl ThresholdRatchet {
    pub fn new(gain_threshold: Decimal, loss_threshold: Decimal, sell_fraction: Decimal) -> Self {
        Self {
            gain_threshold,
            loss_threshold,
            sell_fraction,
        }
    }
}

impl Default for ThresholdRatchet {
    fn default() -> Self {
        Self {
            gain_threshold: Decimal::new(5, 2),
            loss_threshold: Decimal::new(10, 2),
            sell_fraction: Decimal::new(5, 2),
        }
    }
}

impl Strategy for ThresholdRatchet {
    fn name(&self) -> &str {
        "threshold-ratchet"
    }

    fn decide(&self, session: &Session, position: &Position) -> Decision {
        // No usable baseline, nothing to compare against.
        if session.reference_price <= Decimal::ZERO {
            return Decision::Hold;
        }

        let pct = session.pct_change();

        if pct >= self.gain_threshold && session.cash_reserve.is_zero() {
            if position.quantity > 0 {
                let raw = (Decimal::from(position.quantity) * self.sell_fraction).floor();
                let quantity = raw.to_u64().unwrap_or(0).max(1);
                return Decision::Trade {
                    side: Side::Sell,
                    quantity,
                    rationale: format!(
                        "{} gain reached ({}), removing {} of position",
                        bare_pct(self.gain_threshold),
                        signed_pct(pct),
                        bare_pct(self.sell_fraction),
                    ),
                    reserve: ReserveEffect::Set,
                };
            }
        } else if pct <= -self.loss_threshold
            && session.cash_reserve > Decimal::ZERO
            && session.current_price > Decimal::ZERO
        {
            let quantity = (session.cash_reserve / session.current_price)
                .floor()
                .to_u64()
                .unwrap_or(0);
            if quantity > 0 {
                return Decision::Trade {
                    side: Side::Buy,
                    quantity,
                    rationale: format!(
                        "{} loss reached ({}), investing reserved cash",
                        bare_pct(self.loss_threshold),
                        signed_pct(pct),
                    ),
                    reserve: ReserveEffect::Clear,
                };
            }
        }

        Decision::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn session_at(reference: &str, current: &str) -> Session {
        let mut session = Session::new("AAPL".to_string(), d(reference));
        session.observe(d(current));
        session
    }

    fn holding(quantity: u64) -> Position {
        Position {
            quantity,
            ..Position::default()
        }
    }

    #[test]
    fn gain_threshold_sells_fraction_of_position() {
        let strategy = ThresholdRatchet::default();
        let session = session_at("100", "105");

        match strategy.decide(&session, &holding(100)) {
            Decision::Trade {
                side,
                quantity,
                rationale,
                reserve,
            } => {
                assert_eq!(side, Side::Sell);
                assert_eq!(quantity, 5);
                assert!(rationale.contains("5%"), "rationale was: {rationale}");
                assert_eq!(reserve, ReserveEffect::Set);
            }
            other => panic!("expected a sell, got {other:?}"),
        }
    }

    #[test]
    fn small_position_sells_at_least_one_share() {
        let strategy = ThresholdRatchet::default();
        let session = session_at("100", "105");

        // floor(10 * 0.05) = 0, clamped up to 1
        match strategy.decide(&session, &holding(10)) {
            Decision::Trade { quantity, .. } => assert_eq!(quantity, 1),
            other => panic!("expected a sell, got {other:?}"),
        }
    }

    #[test]
    fn gain_without_position_holds() {
        let strategy = ThresholdRatchet::default();
        let session = session_at("100", "105");

        assert_eq!(strategy.decide(&session, &holding(0)), Decision::Hold);
    }

    #[test]
    fn gain_with_outstanding_reserve_holds() {
        let strategy = ThresholdRatchet::default();
        let mut session = session_at("100", "105");
        session.cash_reserve = d("525");

        assert_eq!(strategy.decide(&session, &holding(95)), Decision::Hold);
    }

    #[test]
    fn loss_short_of_threshold_holds() {
        let strategy = ThresholdRatchet::default();
        let mut session = session_at("100", "94.50");
        session.cash_reserve = d("525");

        // -5.5% against the original reference does not reach the 10% gate.
        assert_eq!(strategy.decide(&session, &holding(95)), Decision::Hold);
    }

    #[test]
    fn loss_threshold_redeploys_reserve() {
        let strategy = ThresholdRatchet::default();
        let mut session = session_at("100", "90");
        session.cash_reserve = d("525");

        match strategy.decide(&session, &holding(95)) {
            Decision::Trade {
                side,
                quantity,
                rationale,
                reserve,
            } => {
                assert_eq!(side, Side::Buy);
                assert_eq!(quantity, 5); // floor(525 / 90)
                assert!(rationale.contains("10%"), "rationale was: {rationale}");
                assert_eq!(reserve, ReserveEffect::Clear);
            }
            other => panic!("expected a buy, got {other:?}"),
        }
    }

    #[test]
    fn loss_without_reserve_holds() {
        let strategy = ThresholdRatchet::default();
        let session = session_at("100", "90");

        assert_eq!(strategy.decide(&session, &holding(95)), Decision::Hold);
    }

    #[test]
    fn reserve_smaller_than_one_share_holds() {
        let strategy = ThresholdRatchet::default();
        let mut session = session_at("100", "90");
        session.cash_reserve = d("50");

        // floor(50 / 90) = 0 shares, so nothing to buy.
        assert_eq!(strategy.decide(&session, &holding(95)), Decision::Hold);
    }

    #[test]
    fn unset_reference_price_holds() {
        let strategy = ThresholdRatchet::default();
        let session = Session::new("AAPL".to_string(), Decimal::ZERO);

        assert_eq!(strategy.decide(&session, &holding(100)), Decision::Hold);
    }

    #[test]
    fn decide_is_idempotent() {
        let strategy = ThresholdRatchet::default();
        let session = session_at("100", "105");
        let position = holding(100);

        let first = strategy.decide(&session, &position);
        let second = strategy.decide(&session, &position);
        assert_eq!(first, second);
    }

    #[test]
    fn custom_sell_fraction_is_independent_of_gain_threshold() {
        let strategy = ThresholdRatchet::new(d("0.05"), d("0.10"), d("0.10"));
        let session = session_at("100", "105");

        match strategy.decide(&session, &holding(100)) {
            Decision::Trade { quantity, .. } => assert_eq!(quantity, 10),
            other => panic!("expected a sell, got {other:?}"),
        }
    }
}
