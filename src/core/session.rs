// src/core/session.rs
use rust_decimal::Decimal;

/// Mutable state for one monitoring run over a single instrument.
///
/// Owned exclusively by the monitoring engine; strategies only ever see a
/// shared reference.
#[derive(Debug, Clone)]
pub struct Session {
    pub ticker: String,
    /// Price at session start. Fixed once set; the baseline for every
    /// percentage-change computation.
    pub reference_price: Decimal,
    pub current_price: Decimal,
    pub daily_high: Decimal,
    pub daily_low: Decimal,
    /// Proceeds of the outstanding gain-triggered sell, zero when none.
    pub cash_reserve: Decimal,
    pub running: bool,
}

impl Session {
    pub fn new(ticker: String, initial_price: Decimal) -> Self {
        Self {
            ticker,
            reference_price: initial_price,
            current_price: initial_price,
            daily_high: initial_price,
            daily_low: initial_price,
            cash_reserve: Decimal::ZERO,
            running: false,
        }
    }

    /// Record a fresh price observation, widening the daily extremes.
    pub fn observe(&mut self, price: Decimal) {
        self.current_price = price;
        self.daily_high = self.daily_high.max(price);
        self.daily_low = self.daily_low.min(price);
    }

    /// Fractional change of the current price against the session reference.
    pub fn pct_change(&self) -> Decimal {
        if self.reference_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.current_price - self.reference_price) / self.reference_price
    }
}
