// src/connectors/alpaca.rs
use crate::connectors::error::{BrokerError, BrokerResult};
use crate::connectors::traits::BrokerGateway;
use crate::types::{AccountInfo, Position, Side};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Alpaca REST binding. Trading calls go against `base_url` (paper or live),
/// price lookups against the separate market-data host.
pub struct AlpacaClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_url: String,
    data_url: String,
}

impl AlpacaClient {
    pub fn new(api_key: String, secret_key: String, base_url: String, data_url: String) -> Self {
        Self {
            api_key,
            secret_key,
            http_client: Client::new(),
            base_url,
            data_url,
        }
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> BrokerResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Alpaca error bodies are {"code": ..., "message": "..."}.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(BrokerError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl BrokerGateway for AlpacaClient {
    async fn account_info(&self) -> BrokerResult<AccountInfo> {
        // Alpaca encodes account numerics as JSON strings.
        #[derive(Deserialize)]
        struct AccountResponse {
            buying_power: Decimal,
            cash: Decimal,
            portfolio_value: Decimal,
            daytrade_count: u32,
        }

        let url = format!("{}/v2/account", self.base_url);
        let resp: AccountResponse =
            Self::decode(self.request(Method::GET, &url).send().await?).await?;

        Ok(AccountInfo {
            buying_power: resp.buying_power,
            cash: resp.cash,
            portfolio_value: resp.portfolio_value,
            day_trade_count: resp.daytrade_count,
        })
    }

    async fn latest_price(&self, ticker: &str) -> BrokerResult<Decimal> {
        #[derive(Deserialize)]
        struct LatestTrade {
            #[serde(rename = "p")]
            price: Decimal,
        }
        #[derive(Deserialize)]
        struct LatestTradeResponse {
            trade: LatestTrade,
        }

        let url = format!("{}/v2/stocks/{}/trades/latest", self.data_url, ticker);
        let resp: LatestTradeResponse =
            Self::decode(self.request(Method::GET, &url).send().await?).await?;

        Ok(resp.trade.price)
    }

    async fn position(&self, ticker: &str) -> BrokerResult<Position> {
        #[derive(Deserialize)]
        struct PositionResponse {
            qty: Decimal,
            market_value: Decimal,
            avg_entry_price: Decimal,
            unrealized_pl: Decimal,
            unrealized_plpc: Decimal,
        }

        let url = format!("{}/v2/positions/{}", self.base_url, ticker);
        let response = self.request(Method::GET, &url).send().await?;

        // 404 means "no open position", which is a valid zero position.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Position::default());
        }

        let resp: PositionResponse = Self::decode(response).await?;
        let quantity = resp.qty.to_u64().ok_or_else(|| {
            BrokerError::Parse(format!("position qty {} is not a whole share count", resp.qty))
        })?;

        Ok(Position {
            quantity,
            market_value: resp.market_value,
            avg_entry_price: resp.avg_entry_price,
            unrealized_pnl: resp.unrealized_pl,
            unrealized_pnl_pct: resp.unrealized_plpc,
        })
    }

    async fn submit_order(&self, ticker: &str, quantity: u64, side: Side) -> BrokerResult<()> {
        #[derive(Serialize)]
        struct OrderRequest<'a> {
            symbol: &'a str,
            qty: String,
            side: Side,
            #[serde(rename = "type")]
            order_type: &'a str,
            time_in_force: &'a str,
            client_order_id: String,
        }
        #[derive(Deserialize)]
        struct OrderResponse {
            id: String,
            status: String,
        }

        let body = OrderRequest {
            symbol: ticker,
            qty: quantity.to_string(),
            side,
            order_type: "market",
            time_in_force: "day",
            client_order_id: Uuid::new_v4().to_string(),
        };

        let url = format!("{}/v2/orders", self.base_url);
        let resp: OrderResponse = Self::decode(
            self.request(Method::POST, &url).json(&body).send().await?,
        )
        .await?;

        info!(
            "Order accepted: {} {} shares of {} (id {}, status {})",
            side, quantity, ticker, resp.id, resp.status
        );
        Ok(())
    }

    async fn is_market_open(&self) -> BrokerResult<bool> {
        #[derive(Deserialize)]
        struct ClockResponse {
            is_open: bool,
        }

        let url = format!("{}/v2/clock", self.base_url);
        let resp: ClockResponse =
            Self::decode(self.request(Method::GET, &url).send().await?).await?;

        Ok(resp.is_open)
    }
}
