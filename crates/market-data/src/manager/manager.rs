//! Market data manager with automatic failover.
//!
//! Holds an ordered list of providers, the primary first, and hides provider
//! outages from callers:
//!
//! 1. Quotes are served from a short-lived cache when fresh
//! 2. Requests go to the first usable provider (connected and under the
//!    failure threshold), preferring the primary
//! 3. When the primary has nothing, the connected fallbacks are tried in order
//! 4. Provider errors are logged and counted, never returned

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::errors::MarketDataError;
use crate::models::{Bar, BarRequest, Quote};
use crate::provider::{is_us_market_open, MarketDataProvider, QuoteSink};

use super::cache::QuoteCache;
use super::health::{ProviderHealth, DEFAULT_MAX_FAILURES};
use super::status::{ProviderHealthStatus, ProviderStatus};

/// Index of the primary provider in the provider list.
const PRIMARY: usize = 0;

/// Default quote cache lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Manager tuning.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// How long a cached quote is served before the provider is asked again.
    pub cache_ttl: Duration,
    /// Consecutive failures after which a provider is skipped.
    pub max_failures: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

/// Multi-provider market data access with caching, health tracking and
/// failover.
pub struct MarketDataManager {
    /// Primary first, then fallbacks in order of preference.
    providers: Vec<Arc<dyn MarketDataProvider>>,
    cache: QuoteCache,
    health: ProviderHealth,
    /// Index of the provider that last served a request.
    active: Mutex<usize>,
}

impl MarketDataManager {
    /// Create a manager with default cache TTL and failure threshold.
    pub fn new(
        primary: Arc<dyn MarketDataProvider>,
        fallbacks: Vec<Arc<dyn MarketDataProvider>>,
    ) -> Self {
        Self::with_config(primary, fallbacks, ManagerConfig::default())
    }

    pub fn with_config(
        primary: Arc<dyn MarketDataProvider>,
        fallbacks: Vec<Arc<dyn MarketDataProvider>>,
        config: ManagerConfig,
    ) -> Self {
        let mut providers = Vec::with_capacity(fallbacks.len() + 1);
        providers.push(primary);
        providers.extend(fallbacks);

        info!(
            "Market data manager initialized with primary: {}, fallbacks: [{}]",
            providers[PRIMARY].name(),
            providers[PRIMARY + 1..]
                .iter()
                .map(|p| p.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self {
            providers,
            cache: QuoteCache::new(config.cache_ttl),
            health: ProviderHealth::new(config.max_failures),
            active: Mutex::new(PRIMARY),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(|poisoned| {
            warn!("Active provider mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn fallbacks(&self) -> impl Iterator<Item = (usize, &Arc<dyn MarketDataProvider>)> {
        self.providers.iter().enumerate().skip(PRIMARY + 1)
    }

    fn is_usable(&self, provider: &dyn MarketDataProvider) -> bool {
        provider.is_connected() && self.health.is_healthy(provider.name())
    }

    /// Point the active provider at `index`, warning when it changes.
    fn switch_active(&self, index: usize) {
        let mut active = self.lock_active();
        if *active != index {
            warn!(
                "Switching to fallback provider: {}",
                self.providers[index].name()
            );
            *active = index;
        }
    }

    /// Pick the provider for the next request: the primary if usable,
    /// otherwise the first usable fallback.
    fn working_provider(&self) -> Option<(usize, Arc<dyn MarketDataProvider>)> {
        if self.is_usable(self.providers[PRIMARY].as_ref()) {
            return Some((PRIMARY, self.providers[PRIMARY].clone()));
        }

        for (index, provider) in self.fallbacks() {
            if self.is_usable(provider.as_ref()) {
                self.switch_active(index);
                return Some((index, provider.clone()));
            }
        }

        error!("No working market data providers available");
        None
    }

    /// Fold a provider result into its health: a completed call resets the
    /// failure count, an error is logged and counted.
    fn track<T>(
        &self,
        provider: &dyn MarketDataProvider,
        result: Result<T, MarketDataError>,
    ) -> Option<T> {
        match result {
            Ok(value) => {
                self.health.record_success(provider.name());
                Some(value)
            }
            Err(e) => {
                error!("Error with {}: {}", provider.name(), e);
                self.health.record_failure(provider.name());
                None
            }
        }
    }

    /// Connect every provider.
    ///
    /// Each provider is attempted regardless of how the others fared.
    /// Returns true if at least one connected.
    pub async fn connect(&self) -> bool {
        let mut any_connected = false;

        for provider in &self.providers {
            match provider.connect().await {
                Ok(true) => {
                    info!("Connected to {}", provider.name());
                    any_connected = true;
                }
                Ok(false) => warn!("Failed to connect to {}", provider.name()),
                Err(e) => error!("Error connecting to {}: {}", provider.name(), e),
            }
        }

        any_connected
    }

    /// Disconnect every provider, logging failures.
    pub async fn disconnect(&self) {
        for provider in &self.providers {
            if let Err(e) = provider.disconnect().await {
                error!("Error disconnecting from {}: {}", provider.name(), e);
            }
        }
    }

    /// Current quote for a symbol.
    ///
    /// Returns `None` when no provider has a quote; provider errors are
    /// absorbed.
    pub async fn get_quote(&self, symbol: &str, use_cache: bool) -> Option<Quote> {
        if use_cache {
            if let Some(cached) = self.cache.get(symbol).await {
                debug!("Using cached quote for {}", symbol);
                return Some(cached);
            }
        }

        let (index, provider) = self.working_provider()?;
        let mut quote = self
            .track(provider.as_ref(), provider.get_quote(symbol).await)
            .flatten();

        if quote.is_none() && index == PRIMARY {
            for (fallback_index, fallback) in self.fallbacks() {
                if !fallback.is_connected() {
                    continue;
                }

                info!("Trying fallback provider: {}", fallback.name());
                quote = self
                    .track(fallback.as_ref(), fallback.get_quote(symbol).await)
                    .flatten();

                if quote.is_some() {
                    self.switch_active(fallback_index);
                    break;
                }
            }
        }

        if let Some(quote) = &quote {
            self.cache.insert(quote.clone()).await;
        }

        quote
    }

    /// Current quotes for several symbols.
    ///
    /// Fresh cached quotes are used as-is; the rest are fetched as one batch.
    /// Symbols nobody has data for are absent from the result.
    pub async fn get_quotes(&self, symbols: &[String], use_cache: bool) -> HashMap<String, Quote> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        let mut missing = Vec::new();

        for symbol in symbols {
            let cached = if use_cache {
                self.cache.get(symbol).await
            } else {
                None
            };
            match cached {
                Some(quote) => {
                    quotes.insert(symbol.clone(), quote);
                }
                None => missing.push(symbol.clone()),
            }
        }

        if missing.is_empty() {
            return quotes;
        }

        let (index, provider) = match self.working_provider() {
            Some(found) => found,
            None => return quotes,
        };

        let mut fetched = self.track(provider.as_ref(), provider.get_quotes(&missing).await);

        if fetched.is_none() && index == PRIMARY {
            for (fallback_index, fallback) in self.fallbacks() {
                if !fallback.is_connected() {
                    continue;
                }

                info!("Trying fallback provider: {}", fallback.name());
                let batch = self.track(fallback.as_ref(), fallback.get_quotes(&missing).await);

                if let Some(batch) = batch.filter(|b| !b.is_empty()) {
                    self.switch_active(fallback_index);
                    fetched = Some(batch);
                    break;
                }
            }
        }

        for (symbol, quote) in fetched.unwrap_or_default() {
            self.cache.insert(quote.clone()).await;
            quotes.insert(symbol, quote);
        }

        quotes
    }

    /// Historical OHLCV bars for a symbol. Never cached.
    ///
    /// An error from the primary, or an empty answer from a primary that does
    /// not serve history, moves on to the connected fallbacks. An empty answer
    /// from a provider that does serve history is returned as is.
    pub async fn get_historical_bars(&self, symbol: &str, request: &BarRequest) -> Vec<Bar> {
        let (index, provider) = match self.working_provider() {
            Some(found) => found,
            None => return Vec::new(),
        };

        let bars = self.track(
            provider.as_ref(),
            provider.get_historical_bars(symbol, request).await,
        );

        if index != PRIMARY || !needs_fallback(provider.as_ref(), bars.as_deref()) {
            return bars.unwrap_or_default();
        }

        for (_, fallback) in self.fallbacks() {
            if !fallback.is_connected() {
                continue;
            }

            info!("Trying fallback for historical data: {}", fallback.name());
            let bars = self.track(
                fallback.as_ref(),
                fallback.get_historical_bars(symbol, request).await,
            );

            if !needs_fallback(fallback.as_ref(), bars.as_deref()) {
                return bars.unwrap_or_default();
            }
        }

        Vec::new()
    }

    /// Stream quote updates for `symbols` into `sink` from the working
    /// provider. Returns false if no provider accepted the subscription.
    pub async fn subscribe_quotes(&self, symbols: &[String], sink: QuoteSink) -> bool {
        let Some((_, provider)) = self.working_provider() else {
            return false;
        };
        self.track(provider.as_ref(), provider.subscribe_quotes(symbols, sink).await)
            .is_some()
    }

    /// Stop streaming quote updates for `symbols`.
    pub async fn unsubscribe_quotes(&self, symbols: &[String]) -> bool {
        let Some((_, provider)) = self.working_provider() else {
            return false;
        };
        self.track(provider.as_ref(), provider.unsubscribe_quotes(symbols).await)
            .is_some()
    }

    /// Whether the working provider's market is open.
    ///
    /// Falls back to the US regular session when no provider is usable.
    pub fn is_market_open(&self) -> bool {
        match self.working_provider() {
            Some((_, provider)) => provider.is_market_open(),
            None => is_us_market_open(Utc::now()),
        }
    }

    /// Name of the provider that last served a request.
    pub fn active_provider(&self) -> String {
        let index = *self.lock_active();
        self.providers[index].name().to_string()
    }

    pub fn get_provider_status(&self) -> ProviderStatus {
        ProviderStatus {
            active_provider: self.active_provider(),
            providers: self
                .providers
                .iter()
                .map(|p| ProviderHealthStatus {
                    name: p.name().to_string(),
                    connected: p.is_connected(),
                    failures: self.health.failure_count(p.name()),
                })
                .collect(),
        }
    }

    /// Empty the quote cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("Cleared quote cache");
    }

    /// Zero one provider's failure count so it is eligible again.
    ///
    /// Returns false if no provider has that name.
    pub fn reset_provider(&self, name: &str) -> bool {
        if !self.providers.iter().any(|p| p.name() == name) {
            return false;
        }
        self.health.reset(name);
        true
    }

    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }
}

/// A failed call always moves on. An empty list only does when the provider
/// cannot serve history in the first place.
fn needs_fallback(provider: &dyn MarketDataProvider, bars: Option<&[Bar]>) -> bool {
    match bars {
        None => true,
        Some(bars) => bars.is_empty() && !provider.capabilities().supports_historical,
    }
}
