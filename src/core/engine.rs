// src/core/engine.rs
use std::fmt::Write as _;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::connectors::error::BrokerError;
use crate::connectors::traits::BrokerGateway;
use crate::core::ledger::{TradeLedger, TradeRecord};
use crate::core::session::Session;
use crate::strategies::traits::Strategy;
use crate::types::{AccountInfo, Decision, Position, ReserveEffect};
use crate::utils::format::{signed_pct, usd};

#[derive(Debug, Error)]
pub enum EngineError {
    /// No initial reference price could be obtained. Fatal for the run:
    /// without a baseline there is nothing to rebalance against.
    #[error("could not obtain an initial price for {ticker}: {source}")]
    Initialization {
        ticker: String,
        source: BrokerError,
    },
}

/// The monitoring loop: polls the price, feeds the strategy, executes its
/// decisions through the broker gateway and keeps the session state and
/// trade ledger current between iterations.
pub struct MonitorEngine<S> {
    broker: Box<dyn BrokerGateway>,
    strategy: S,
    ledger: TradeLedger,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S> MonitorEngine<S>
where
    S: Strategy,
{
    pub fn new(
        broker: Box<dyn BrokerGateway>,
        strategy: S,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            broker,
            strategy,
            ledger: TradeLedger::new(),
            poll_interval,
            shutdown,
        }
    }

    /// Monitor `ticker` until the market closes, a stop is requested or the
    /// initial price cannot be obtained. Always prints the session summary on
    /// the way out; returns the final session state.
    pub async fn run(&mut self, ticker: &str) -> Result<Session, EngineError> {
        let ticker = ticker.to_uppercase();
        info!(
            "Starting monitoring for {} with strategy {}",
            ticker,
            self.strategy.name()
        );

        let initial_price = match self.broker.latest_price(&ticker).await {
            Ok(price) => price,
            Err(source) => return Err(EngineError::Initialization { ticker, source }),
        };

        let mut session = Session::new(ticker, initial_price);
        info!(
            "Initial price for {}: {}",
            session.ticker,
            usd(session.reference_price)
        );

        // Opening position is informational only; it has no effect on the
        // reserve accounting.
        match self.broker.position(&session.ticker).await {
            Ok(position) => info!(
                "Initial position: {} shares (avg entry {}, market value {}, unrealized P&L {} / {})",
                position.quantity,
                usd(position.avg_entry_price),
                usd(position.market_value),
                usd(position.unrealized_pnl),
                signed_pct(position.unrealized_pnl_pct),
            ),
            Err(e) => warn!("Could not fetch initial position: {e}"),
        }

        session.running = true;

        while session.running {
            match self.broker.is_market_open().await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Market is closed, ending session");
                    break;
                }
                Err(e) => {
                    warn!("Market status check failed ({e}), treating market as closed");
                    break;
                }
            }

            match self.broker.latest_price(&session.ticker).await {
                Ok(price) => {
                    session.observe(price);
                    self.evaluate(&mut session).await;
                }
                Err(e) => warn!(
                    "Price fetch for {} failed ({e}), skipping this iteration",
                    session.ticker
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.shutdown.changed() => {
                    info!("Stop requested, ending session");
                    session.running = false;
                }
            }
        }

        session.running = false;
        self.finish(&session).await;
        Ok(session)
    }

    /// One decision step against a freshly observed price.
    async fn evaluate(&mut self, session: &mut Session) {
        let position = match self.broker.position(&session.ticker).await {
            Ok(position) => position,
            Err(e) => {
                warn!(
                    "Position fetch for {} failed ({e}), skipping decision",
                    session.ticker
                );
                return;
            }
        };

        info!(
            "Price: {} ({}) | Position: {} shares | Cash reserve: {}",
            usd(session.current_price),
            signed_pct(session.pct_change()),
            position.quantity,
            usd(session.cash_reserve),
        );

        let decision = self.strategy.decide(session, &position);
        let Decision::Trade {
            side,
            quantity,
            rationale,
            reserve,
        } = decision
        else {
            return;
        };

        info!("Rebalancing: {rationale}");
        match self.broker.submit_order(&session.ticker, quantity, side).await {
            Ok(()) => {
                info!("Order placed: {} {} shares of {}", side, quantity, session.ticker);
                self.ledger.record(TradeRecord {
                    timestamp: Utc::now(),
                    ticker: session.ticker.clone(),
                    side,
                    quantity,
                    price: session.current_price,
                    rationale,
                });
                match reserve {
                    ReserveEffect::Set => {
                        session.cash_reserve =
                            Decimal::from(quantity) * session.current_price;
                        info!("Reserved {} in cash", usd(session.cash_reserve));
                    }
                    ReserveEffect::Clear => {
                        session.cash_reserve = Decimal::ZERO;
                        info!("Reserved cash redeployed");
                    }
                }
            }
            // A failed submission mutates nothing; the same conditions are
            // re-evaluated on the next poll.
            Err(e) => error!("Order submission for {} failed: {e}", session.ticker),
        }
    }

    async fn finish(&mut self, session: &Session) {
        info!("Monitoring stopped for {}", session.ticker);

        let final_position = match self.broker.position(&session.ticker).await {
            Ok(position) => Some(position),
            Err(e) => {
                warn!("Could not fetch final position for the summary: {e}");
                None
            }
        };
        let account = match self.broker.account_info().await {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("Could not fetch account info for the summary: {e}");
                None
            }
        };

        println!("{}", self.render_summary(session, final_position, account));
    }

    fn render_summary(
        &self,
        session: &Session,
        final_position: Option<Position>,
        account: Option<AccountInfo>,
    ) -> String {
        let mut out = String::new();
        let rule = "=".repeat(50);

        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(out, "DAILY SUMMARY FOR {}", session.ticker);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Initial price: {}", usd(session.reference_price));
        let _ = writeln!(out, "Final price:   {}", usd(session.current_price));
        let _ = writeln!(out, "Daily change:  {}", signed_pct(session.pct_change()));
        let _ = writeln!(out, "Daily high:    {}", usd(session.daily_high));
        let _ = writeln!(out, "Daily low:     {}", usd(session.daily_low));
        if let Some(position) = final_position {
            let _ = writeln!(out, "Final position: {} shares", position.quantity);
        }
        let _ = writeln!(out, "Cash reserve:  {}", usd(session.cash_reserve));

        if self.ledger.is_empty() {
            let _ = writeln!(out, "\nNo trades executed");
        } else {
            let _ = writeln!(out, "\nTrades executed: {}", self.ledger.len());
            for trade in self.ledger.all() {
                let _ = writeln!(
                    out,
                    "  {} - {} {} {} @ {} - {}",
                    trade.timestamp.format("%H:%M:%S"),
                    trade.side.as_str().to_uppercase(),
                    trade.quantity,
                    trade.ticker,
                    usd(trade.price),
                    trade.rationale,
                );
            }
        }

        if let Some(account) = account {
            let _ = writeln!(out, "\nAccount value: {}", usd(account.portfolio_value));
            let _ = writeln!(out, "Buying power:  {}", usd(account.buying_power));
            let _ = writeln!(out, "Cash:          {}", usd(account.cash));
            let _ = writeln!(out, "Day trades:    {}", account.day_trade_count);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::mock::ScriptedBroker;
    use crate::strategies::ratchet::ThresholdRatchet;
    use crate::types::Side;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn engine_for(
        broker: &ScriptedBroker,
    ) -> (MonitorEngine<ThresholdRatchet>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let engine = MonitorEngine::new(
            Box::new(broker.clone()),
            ThresholdRatchet::default(),
            Duration::ZERO,
            rx,
        );
        (engine, tx)
    }

    #[tokio::test]
    async fn gain_event_sells_and_reserves_the_proceeds() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("105")
            .with_position(100)
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("aapl").await.unwrap();

        let orders = broker.attempted_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].ticker, "AAPL");
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(orders[0].quantity, 5);

        assert_eq!(session.cash_reserve, d("525"));
        assert_eq!(session.daily_high, d("105"));
        assert_eq!(engine.ledger.len(), 1);
        assert_eq!(engine.ledger.all()[0].price, d("105"));
    }

    #[tokio::test]
    async fn full_reserve_cycle_sells_then_redeploys() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("105")
            .price("90")
            .with_position(100)
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("AAPL").await.unwrap();

        let orders = broker.attempted_orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(orders[0].quantity, 5);
        assert_eq!(orders[1].side, Side::Buy);
        assert_eq!(orders[1].quantity, 5); // floor(525 / 90)

        assert_eq!(session.cash_reserve, Decimal::ZERO);
        assert_eq!(session.daily_high, d("105"));
        assert_eq!(session.daily_low, d("90"));
        assert_eq!(engine.ledger.len(), 2);
    }

    #[tokio::test]
    async fn dip_inside_the_window_does_not_trade() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("105")
            .price("94.50")
            .with_position(100)
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("AAPL").await.unwrap();

        // -5.5% from the original reference stays short of the 10% gate, so
        // the reserve from the sell at 105 is still outstanding.
        assert_eq!(broker.attempted_orders().len(), 1);
        assert_eq!(session.cash_reserve, d("525"));
    }

    #[tokio::test]
    async fn price_outages_skip_iterations_without_touching_state() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .outage()
            .outage()
            .outage()
            .with_position(100)
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("AAPL").await.unwrap();

        assert!(broker.attempted_orders().is_empty());
        assert!(engine.ledger.is_empty());
        assert_eq!(session.current_price, d("100"));
        assert_eq!(session.daily_high, d("100"));
        assert_eq!(session.daily_low, d("100"));
    }

    #[tokio::test]
    async fn rejected_order_leaves_reserve_and_ledger_untouched() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("105")
            .price("106")
            .with_position(100)
            .reject_orders()
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("AAPL").await.unwrap();

        // Both gain iterations attempt the sell, since the first rejection
        // left the reserve at zero.
        assert_eq!(broker.attempted_orders().len(), 2);
        assert!(engine.ledger.is_empty());
        assert_eq!(session.cash_reserve, Decimal::ZERO);
    }

    #[tokio::test]
    async fn position_failures_skip_the_decision_step() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("105")
            .fail_positions()
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("AAPL").await.unwrap();

        assert!(broker.attempted_orders().is_empty());
        // The price observation itself still lands.
        assert_eq!(session.daily_high, d("105"));
    }

    #[tokio::test]
    async fn missing_initial_price_is_fatal() {
        let broker = ScriptedBroker::builder().outage().build();
        let (mut engine, _tx) = engine_for(&broker);

        let result = engine.run("AAPL").await;
        assert!(matches!(
            result,
            Err(EngineError::Initialization { ref ticker, .. }) if ticker == "AAPL"
        ));
        assert!(broker.attempted_orders().is_empty());
    }

    #[tokio::test]
    async fn stop_signal_interrupts_the_sleep() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("101")
            .price("101")
            .price("101")
            .with_position(100)
            .build();
        let (tx, rx) = watch::channel(false);
        let mut engine = MonitorEngine::new(
            Box::new(broker.clone()),
            ThresholdRatchet::default(),
            Duration::from_secs(600),
            rx,
        );

        // The stop arrives before the first sleep; without cancellation this
        // run would hang for ten minutes.
        tx.send(true).unwrap();
        let session = engine.run("AAPL").await.unwrap();

        assert!(!session.running);
        assert!(broker.attempted_orders().is_empty());
    }

    #[tokio::test]
    async fn summary_reports_prices_trades_and_account() {
        let broker = ScriptedBroker::builder()
            .price("100")
            .price("105")
            .price("90")
            .with_position(100)
            .build();
        let (mut engine, _tx) = engine_for(&broker);

        let session = engine.run("AAPL").await.unwrap();
        let summary = engine.render_summary(
            &session,
            Some(Position {
                quantity: 100,
                ..Position::default()
            }),
            Some(AccountInfo {
                buying_power: d("50000"),
                cash: d("25000"),
                portfolio_value: d("100000"),
                day_trade_count: 0,
            }),
        );

        assert!(summary.contains("DAILY SUMMARY FOR AAPL"));
        assert!(summary.contains("Initial price: $100.00"));
        assert!(summary.contains("Final price:   $90.00"));
        assert!(summary.contains("Daily change:  -10.00%"));
        assert!(summary.contains("Daily high:    $105.00"));
        assert!(summary.contains("Daily low:     $90.00"));
        assert!(summary.contains("Final position: 100 shares"));
        assert!(summary.contains("Trades executed: 2"));
        assert!(summary.contains("SELL 5 AAPL @ $105.00"));
        assert!(summary.contains("BUY 5 AAPL @ $90.00"));
        assert!(summary.contains("Account value: $100000.00"));
        assert!(summary.contains("Buying power:  $50000.00"));
    }
}
