// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Held position in the monitored instrument. The all-zero default is the
/// "no position" value; the gateway never errors just because nothing is held.
#[derive(Debug, Clone, Default)]
pub struct Position {
    pub quantity: u64,
    pub market_value: Decimal,
    pub avg_entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
}

#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub buying_power: Decimal,
    pub cash: Decimal,
    pub portfolio_value: Decimal,
    pub day_trade_count: u32,
}

/// How a confirmed trade changes the session's cash reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveEffect {
    /// The sale proceeds become the reserve.
    Set,
    /// The reserve has been spent.
    Clear,
}

/// Outcome of one strategy evaluation, consumed immediately by the loop.
/// `rationale` is for logging and the trade ledger only.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Hold,
    Trade {
        side: Side,
        quantity: u64,
        rationale: String,
        reserve: ReserveEffect,
    },
}
