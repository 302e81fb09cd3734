// src/connectors/mock.rs
//! Scripted broker for exercising the monitoring loop without network calls.
//! The test scripts a sequence of price poll outcomes; the market reports
//! itself open while any scripted step remains, then closed.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::connectors::error::{BrokerError, BrokerResult};
use crate::connectors::traits::BrokerGateway;
use crate::types::{AccountInfo, Position, Side};

/// One scripted outcome for a `latest_price` poll.
#[derive(Debug, Clone)]
pub enum PriceStep {
    Price(Decimal),
    Unavailable,
}

/// An order the engine attempted to submit, recorded for assertions.
#[derive(Debug, Clone)]
pub struct RecordedOrder {
    pub ticker: String,
    pub quantity: u64,
    pub side: Side,
}

pub struct ScriptedBrokerBuilder {
    steps: VecDeque<PriceStep>,
    position_qty: u64,
    reject_orders: bool,
    fail_positions: bool,
}

impl ScriptedBrokerBuilder {
    pub fn price(mut self, price: &str) -> Self {
        self.steps
            .push_back(PriceStep::Price(Decimal::from_str(price).unwrap()));
        self
    }

    pub fn outage(mut self) -> Self {
        self.steps.push_back(PriceStep::Unavailable);
        self
    }

    pub fn with_position(mut self, quantity: u64) -> Self {
        self.position_qty = quantity;
        self
    }

    pub fn reject_orders(mut self) -> Self {
        self.reject_orders = true;
        self
    }

    pub fn fail_positions(mut self) -> Self {
        self.fail_positions = true;
        self
    }

    pub fn build(self) -> ScriptedBroker {
        ScriptedBroker {
            state: Arc::new(BrokerState {
                steps: Mutex::new(self.steps),
                position_qty: Mutex::new(self.position_qty),
                reject_orders: self.reject_orders,
                fail_positions: self.fail_positions,
                orders: Mutex::new(Vec::new()),
            }),
        }
    }
}

struct BrokerState {
    steps: Mutex<VecDeque<PriceStep>>,
    position_qty: Mutex<u64>,
    reject_orders: bool,
    fail_positions: bool,
    orders: Mutex<Vec<RecordedOrder>>,
}

/// Cloning shares the underlying state, so a test can keep a handle while
/// the engine owns the boxed gateway.
#[derive(Clone)]
pub struct ScriptedBroker {
    state: Arc<BrokerState>,
}

impl ScriptedBroker {
    pub fn builder() -> ScriptedBrokerBuilder {
        ScriptedBrokerBuilder {
            steps: VecDeque::new(),
            position_qty: 0,
            reject_orders: false,
            fail_positions: false,
        }
    }

    /// Every order the engine attempted, accepted or not, in order.
    pub fn attempted_orders(&self) -> Vec<RecordedOrder> {
        self.state.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerGateway for ScriptedBroker {
    async fn account_info(&self) -> BrokerResult<AccountInfo> {
        Ok(AccountInfo {
            buying_power: Decimal::from(50_000),
            cash: Decimal::from(25_000),
            portfolio_value: Decimal::from(100_000),
            day_trade_count: 0,
        })
    }

    async fn latest_price(&self, _ticker: &str) -> BrokerResult<Decimal> {
        match self.state.steps.lock().unwrap().pop_front() {
            Some(PriceStep::Price(price)) => Ok(price),
            Some(PriceStep::Unavailable) => Err(BrokerError::Api {
                status: 404,
                message: "scripted price outage".into(),
            }),
            None => Err(BrokerError::Api {
                status: 503,
                message: "price script exhausted".into(),
            }),
        }
    }

    async fn position(&self, _ticker: &str) -> BrokerResult<Position> {
        if self.state.fail_positions {
            return Err(BrokerError::Api {
                status: 500,
                message: "scripted position failure".into(),
            });
        }
        Ok(Position {
            quantity: *self.state.position_qty.lock().unwrap(),
            ..Position::default()
        })
    }

    async fn submit_order(&self, ticker: &str, quantity: u64, side: Side) -> BrokerResult<()> {
        self.state.orders.lock().unwrap().push(RecordedOrder {
            ticker: ticker.to_string(),
            quantity,
            side,
        });

        if self.state.reject_orders {
            return Err(BrokerError::Api {
                status: 403,
                message: "scripted order rejection".into(),
            });
        }

        // Apply the fill so later position fetches see it.
        let mut qty = self.state.position_qty.lock().unwrap();
        *qty = match side {
            Side::Buy => *qty + quantity,
            Side::Sell => qty.saturating_sub(quantity),
        };
        Ok(())
    }

    async fn is_market_open(&self) -> BrokerResult<bool> {
        Ok(!self.state.steps.lock().unwrap().is_empty())
    }
}
