// src/main.rs
use crate::config::AppConfig;
use crate::connectors::alpaca::AlpacaClient;
use crate::core::engine::MonitorEngine;
use crate::strategies::ratchet::ThresholdRatchet;
use crate::utils::format::bare_pct;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::prelude::*;

mod config;
mod connectors;
mod core;
mod strategies;
mod types;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new()?;

    if config.api_key.is_empty() || config.secret_key.is_empty() {
        eprintln!("Missing Alpaca API credentials!");
        eprintln!("Either set environment variables:");
        eprintln!("  export APP_API_KEY='your_key'");
        eprintln!("  export APP_SECRET_KEY='your_secret'");
        eprintln!("or put them in Settings.toml (see Settings.example.toml).");
        std::process::exit(1);
    }

    // First CLI argument overrides the configured ticker.
    let ticker = env::args().nth(1).unwrap_or_else(|| config.ticker.clone());
    if ticker.trim().is_empty() {
        eprintln!("No ticker provided! Pass one as the first argument or set APP_TICKER.");
        std::process::exit(1);
    }

    // 2. Logging: everything goes to stdout and to the trading log file.
    let file_appender = tracing_appender::rolling::never(".", &config.log_file);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    println!("========================================");
    println!("       RATCHET BOT - v0.1.0");
    println!("========================================");
    println!("Target: {}", ticker.to_uppercase());
    println!("Strategy:");
    println!(
        "- Price up {} from session open: sell {} of the position",
        bare_pct(config.strategy.gain_threshold),
        bare_pct(config.strategy.sell_fraction),
    );
    println!(
        "- Price down {} from session open: buy back with reserved cash",
        bare_pct(config.strategy.loss_threshold),
    );
    println!();
    println!("Press Ctrl+C to stop monitoring");
    println!("========================================");

    // 3. Initialize Components
    let client = AlpacaClient::new(
        config.api_key.clone(),
        config.secret_key.clone(),
        config.base_url.clone(),
        config.data_url.clone(),
    );
    let strategy = ThresholdRatchet::new(
        config.strategy.gain_threshold,
        config.strategy.loss_threshold,
        config.strategy.sell_fraction,
    );

    // 4. Wire the stop signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    // 5. Run Engine
    let mut engine = MonitorEngine::new(
        Box::new(client),
        strategy,
        Duration::from_secs(config.poll_interval_secs),
        shutdown_rx,
    );

    if let Err(e) = engine.run(&ticker).await {
        eprintln!("Fatal Engine Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
