// src/connectors/traits.rs
use crate::connectors::error::BrokerResult;
use crate::types::{AccountInfo, Position, Side};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Capability surface the monitoring loop needs from a brokerage backend.
///
/// Every call can fail independently. Callers treat failures as transient
/// unless stated otherwise; no call here terminates the process by itself.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    async fn account_info(&self) -> BrokerResult<AccountInfo>;

    /// Last traded price for the ticker.
    async fn latest_price(&self, ticker: &str) -> BrokerResult<Decimal>;

    /// Current position, all-zero when none is held.
    async fn position(&self, ticker: &str) -> BrokerResult<Position>;

    /// Submit a market order with day validity.
    async fn submit_order(&self, ticker: &str, quantity: u64, side: Side) -> BrokerResult<()>;

    async fn is_market_open(&self) -> BrokerResult<bool>;
}
