//! TradeGuard Market Data Crate
//!
//! Resilient access to quotes and historical bars across several
//! unreliable providers.
//!
//! # Overview
//!
//! - Provider-agnostic [`Quote`] and [`Bar`] models
//! - A [`MarketDataProvider`] trait with Yahoo Finance and broker-session
//!   implementations
//! - A [`MarketDataManager`] that caches quotes, tracks provider health and
//!   fails over from the primary provider to ordered fallbacks
//!
//! # Architecture
//!
//! ```text
//!          caller (orchestrator, strategies)
//!                       |
//!                       v
//!             +-------------------+
//!             | MarketDataManager |  cache -> working provider -> fallbacks
//!             +-------------------+
//!                 |            |
//!                 v            v
//!        +---------------+  +---------------+
//!        |    primary    |  |  fallback(s)  |   (Yahoo, Broker, ...)
//!        +---------------+  +---------------+
//! ```
//!
//! Provider errors never reach the caller: the manager logs them, counts them
//! against the provider and answers with an absent result instead.

pub mod errors;
pub mod manager;
pub mod models;
pub mod provider;

pub use errors::MarketDataError;

pub use models::{Bar, BarRequest, Quote};

pub use provider::broker::{BrokerProvider, BrokerQuoteSource, DEFAULT_SETTLE_DELAY};
pub use provider::yahoo::YahooProvider;
pub use provider::{is_us_market_open, MarketDataProvider, ProviderCapabilities, QuoteSink};

pub use manager::{
    ManagerConfig, MarketDataManager, ProviderHealthStatus, ProviderStatus, DEFAULT_CACHE_TTL,
    DEFAULT_MAX_FAILURES,
};
