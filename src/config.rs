// src/config.rs

use config::{Config, ConfigError, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    pub gain_threshold: Decimal,
    pub loss_threshold: Decimal,
    // Independent of gain_threshold even though both default to 5%.
    pub sell_fraction: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub secret_key: String,
    pub base_url: String,
    pub data_url: String,
    pub ticker: String,
    pub poll_interval_secs: u64,
    pub log_file: String,
    pub strategy: StrategyConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("api_key", "")?
            .set_default("secret_key", "")?
            .set_default("base_url", "https://paper-api.alpaca.markets")?
            .set_default("data_url", "https://data.alpaca.markets")?
            .set_default("ticker", "")?
            .set_default("poll_interval_secs", 30)?
            .set_default("log_file", "trading-bot.log")?
            .set_default("strategy.gain_threshold", "0.05")?
            .set_default("strategy.loss_threshold", "0.10")?
            .set_default("strategy.sell_fraction", "0.05")?
            .add_source(File::with_name("Settings").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}
