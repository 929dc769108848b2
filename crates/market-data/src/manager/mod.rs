//! Provider orchestration.
//!
//! - Quote caching with a fixed TTL
//! - Consecutive-failure health tracking per provider
//! - Primary/fallback selection and failover

mod cache;
mod health;
mod manager;
mod status;


pub use cache::QuoteCache;
pub use health::{ProviderHealth, DEFAULT_MAX_FAILURES};
pub use manager::{ManagerConfig, MarketDataManager, DEFAULT_CACHE_TTL};
pub use status::{ProviderHealthStatus, ProviderStatus};
