//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities
//! - Concrete providers: Yahoo Finance and the broker-session adapter
//!
//! Providers are plain data sources. Failover, caching and health tracking
//! belong to the [`MarketDataManager`](crate::MarketDataManager).

mod capabilities;
mod market_hours;
mod traits;

pub mod broker;
pub mod yahoo;

pub use capabilities::ProviderCapabilities;
pub use market_hours::is_us_market_open;
pub use traits::{MarketDataProvider, QuoteSink};
