// src/core/ledger.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::types::Side;

/// A confirmed execution. Created only after the broker accepted the order,
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub ticker: String,
    pub side: Side,
    pub quantity: u64,
    pub price: Decimal,
    pub rationale: String,
}

/// Append-only record of the run's executed trades, in execution order.
/// Consulted only by the end-of-run summary, never by the decision logic.
#[derive(Debug, Default)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: TradeRecord) {
        self.records.push(record);
    }

    pub fn all(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
