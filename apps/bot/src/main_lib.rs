use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tradeguard_market_data::{ManagerConfig, MarketDataManager, MarketDataProvider, YahooProvider};
use tradeguard_risk::RiskEngine;
use tradeguard_strategies::{Momentum, MovingAverageCrossover, Strategy};

use crate::bot::{BotOptions, TradingBot};
use crate::config::{Config, StrategyKind};
use crate::venue::PaperVenue;

pub fn init_tracing() {
    let log_format = std::env::var("TG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

fn build_provider(name: &str) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    match name {
        "yahoo" => Ok(Arc::new(
            YahooProvider::new().context("Failed to create Yahoo Finance provider")?,
        )),
        other => anyhow::bail!("Unsupported market data provider: {}", other),
    }
}

pub fn build_manager(config: &Config) -> anyhow::Result<MarketDataManager> {
    let settings = &config.market_data;
    let primary = build_provider(&settings.primary)?;
    let fallbacks = settings
        .fallbacks
        .iter()
        .map(|name| build_provider(name))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(MarketDataManager::with_config(
        primary,
        fallbacks,
        ManagerConfig {
            cache_ttl: settings.cache_ttl,
            max_failures: settings.max_failures,
        },
    ))
}

pub fn build_strategies(config: &Config) -> Vec<Box<dyn Strategy>> {
    let symbols = config.bot.symbols.clone();
    let strategy: Box<dyn Strategy> = match config.bot.strategy {
        StrategyKind::MovingAverage => Box::new(MovingAverageCrossover::new(symbols)),
        StrategyKind::Momentum => Box::new(Momentum::new(symbols)),
    };
    vec![strategy]
}

/// Wire every component from a validated configuration.
pub fn build_bot(config: &Config) -> anyhow::Result<TradingBot> {
    let manager = build_manager(config)?;
    let risk = RiskEngine::new(config.trading.limits.clone())?;
    let (venue, events) = PaperVenue::new();

    let options = BotOptions {
        symbols: config.bot.symbols.clone(),
        update_interval: config.bot.update_interval,
        enable_trading: config.trading.enable_trading,
        order_type: config.trading.default_order_type,
    };

    Ok(TradingBot::new(
        options,
        Arc::new(manager),
        Arc::new(risk),
        build_strategies(config),
        Arc::new(venue),
        events,
    ))
}
