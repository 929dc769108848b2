use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tradeguard_risk::RiskLimits;

use crate::error::ConfigError;
use crate::venue::OrderType;

/// Providers this binary knows how to build.
pub const SUPPORTED_PROVIDERS: &[&str] = &["yahoo"];

/// Which strategy the bot runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    MovingAverage,
    Momentum,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovingAverage => write!(f, "ma"),
            Self::Momentum => write!(f, "momentum"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataSettings {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub cache_ttl: Duration,
    pub max_failures: u32,
}

#[derive(Debug, Clone)]
pub struct TradingSettings {
    pub limits: RiskLimits,
    pub enable_trading: bool,
    pub paper_trading: bool,
    pub default_order_type: OrderType,
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub symbols: Vec<String>,
    pub strategy: StrategyKind,
    pub update_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub market_data: MarketDataSettings,
    pub trading: TradingSettings,
    pub bot: BotSettings,
    /// Values that could not be parsed and have no sensible default.
    problems: Vec<String>,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup. Unset keys take their defaults; unparsable
    /// numbers fall back to the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };
        let mut problems = Vec::new();
        let defaults = RiskLimits::default();

        let market_data = MarketDataSettings {
            primary: env
                .string("TG_MARKET_DATA_PROVIDER", "yahoo")
                .to_ascii_lowercase(),
            fallbacks: env
                .list("TG_MARKET_DATA_FALLBACK", "")
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
            cache_ttl: Duration::from_secs(env.parse("TG_CACHE_TTL_SECS", 5)),
            max_failures: env.parse("TG_MAX_PROVIDER_FAILURES", 3),
        };

        let order_type_raw = env.string("TG_DEFAULT_ORDER_TYPE", "LMT");
        let default_order_type = match order_type_raw.to_ascii_uppercase().as_str() {
            "LMT" => OrderType::Limit,
            "MKT" => OrderType::Market,
            other => {
                problems.push(format!(
                    "TG_DEFAULT_ORDER_TYPE must be LMT or MKT, got {}",
                    other
                ));
                OrderType::Limit
            }
        };

        let trading = TradingSettings {
            limits: RiskLimits {
                max_position_size: env
                    .parse("TG_MAX_POSITION_SIZE", defaults.max_position_size),
                max_positions: env.parse("TG_MAX_POSITIONS", defaults.max_positions),
                max_daily_loss: env.parse("TG_MAX_DAILY_LOSS", defaults.max_daily_loss),
                max_order_value: env.parse("TG_MAX_ORDER_VALUE", defaults.max_order_value),
                max_portfolio_exposure: env
                    .parse("TG_MAX_PORTFOLIO_EXPOSURE", defaults.max_portfolio_exposure),
                max_symbol_concentration: env.parse(
                    "TG_MAX_SYMBOL_CONCENTRATION",
                    defaults.max_symbol_concentration,
                ),
            },
            enable_trading: env.flag("TG_ENABLE_TRADING", false),
            paper_trading: env.flag("TG_PAPER_TRADING", true),
            default_order_type,
        };

        let strategy_raw = env.string("TG_STRATEGY", "ma");
        let strategy = match strategy_raw.to_ascii_lowercase().as_str() {
            "ma" => StrategyKind::MovingAverage,
            "momentum" => StrategyKind::Momentum,
            other => {
                problems.push(format!("TG_STRATEGY must be ma or momentum, got {}", other));
                StrategyKind::MovingAverage
            }
        };

        let bot = BotSettings {
            symbols: env
                .list("TG_SYMBOLS", "AAPL,MSFT,GOOGL")
                .into_iter()
                .map(|s| s.to_ascii_uppercase())
                .collect(),
            strategy,
            update_interval: Duration::from_secs(env.parse("TG_UPDATE_INTERVAL_SECS", 5)),
        };

        Self {
            market_data,
            trading,
            bot,
            problems,
        }
    }

    /// Check the whole configuration, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = self.problems.clone();

        let mut seen = HashSet::new();
        let providers =
            std::iter::once(&self.market_data.primary).chain(self.market_data.fallbacks.iter());
        for name in providers {
            if name == "broker" {
                problems.push(
                    "market data provider 'broker' needs a live broker session, which this binary does not ship"
                        .to_string(),
                );
            } else if !SUPPORTED_PROVIDERS.contains(&name.as_str()) {
                problems.push(format!(
                    "unknown market data provider '{}' (supported: {})",
                    name,
                    SUPPORTED_PROVIDERS.join(", ")
                ));
            }
            if !seen.insert(name.as_str()) {
                problems.push(format!("market data provider '{}' listed more than once", name));
            }
        }

        if self.market_data.max_failures == 0 {
            problems.push("TG_MAX_PROVIDER_FAILURES must be at least 1".to_string());
        }

        if let Err(e) = self.trading.limits.validate() {
            problems.push(e.to_string());
        }

        if !self.trading.paper_trading {
            problems.push("live trading is not available; set TG_PAPER_TRADING=true".to_string());
        }

        if self.bot.symbols.is_empty() {
            problems.push("TG_SYMBOLS must name at least one symbol".to_string());
        }

        if self.bot.update_interval.is_zero() {
            problems.push("TG_UPDATE_INTERVAL_SECS must be at least 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn log_summary(&self) {
        let limits = &self.trading.limits;
        tracing::info!("Configuration summary");
        tracing::info!(
            "[Market Data] primary={}, fallbacks=[{}], cache_ttl={}s, max_failures={}",
            self.market_data.primary,
            self.market_data.fallbacks.join(", "),
            self.market_data.cache_ttl.as_secs(),
            self.market_data.max_failures
        );
        tracing::info!(
            "[Trading] enabled={}, mode={}, order_type={}",
            self.trading.enable_trading,
            if self.trading.paper_trading {
                "PAPER"
            } else {
                "LIVE"
            },
            self.trading.default_order_type
        );
        tracing::info!(
            "[Risk] max_position_size=${:.2}, max_positions={}, max_daily_loss=${:.2}, max_order_value=${:.2}, max_portfolio_exposure=${:.2}, max_symbol_concentration={}",
            limits.max_position_size,
            limits.max_positions,
            limits.max_daily_loss,
            limits.max_order_value,
            limits.max_portfolio_exposure,
            limits.max_symbol_concentration
        );
        tracing::info!(
            "[Bot] symbols=[{}], strategy={}, update_interval={}s",
            self.bot.symbols.join(", "),
            self.bot.strategy,
            self.bot.update_interval.as_secs()
        );
    }
}

struct Env<'a, F> {
    lookup: &'a F,
}

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str, default: &str) -> String {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn list(&self, key: &str, default: &str) -> Vec<String> {
        self.string(key, default)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match (self.lookup)(key) {
            Some(v) => matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ),
            None => default,
        }
    }

    fn parse<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + fmt::Display,
    {
        let Some(raw) = (self.lookup)(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid {}={:?}, using default {}", key, raw, default);
                default
            }
        }
    }
}
