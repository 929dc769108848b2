//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that every
//! data source implements. The manager only ever sees this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;

use crate::errors::MarketDataError;
use crate::models::{Bar, BarRequest, Quote};

use super::capabilities::ProviderCapabilities;
use super::market_hours::is_us_market_open;

/// Channel end that receives streamed quote updates.
pub type QuoteSink = UnboundedSender<Quote>;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new market data source.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use tradeguard_market_data::{MarketDataProvider, MarketDataError, Quote};
///
/// struct MyProvider {
///     connected: AtomicBool,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn name(&self) -> &str {
///         "MY_PROVIDER"
///     }
///
///     fn is_connected(&self) -> bool {
///         self.connected.load(Ordering::SeqCst)
///     }
///
///     // ... implement connection and quote methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique name for this provider, e.g. "YAHOO" or "BROKER".
    ///
    /// Used for logging, health tracking and status reporting.
    fn name(&self) -> &str;

    /// Whether the provider currently holds a usable connection.
    fn is_connected(&self) -> bool;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// Connect to the data source.
    ///
    /// Returns `Ok(false)` when the source refused the connection without an
    /// error of its own.
    async fn connect(&self) -> Result<bool, MarketDataError>;

    /// Disconnect and release any subscriptions.
    async fn disconnect(&self) -> Result<(), MarketDataError>;

    /// Fetch the current quote for a symbol.
    ///
    /// `Ok(None)` means the provider answered but had no data for the symbol.
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, MarketDataError>;

    /// Fetch current quotes for several symbols.
    ///
    /// Symbols without data are left out of the returned map.
    async fn get_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError>;

    /// Fetch historical OHLCV bars, ordered by timestamp ascending.
    ///
    /// Providers without historical support return an empty list and report
    /// `supports_historical: false` in their capabilities.
    async fn get_historical_bars(
        &self,
        symbol: &str,
        request: &BarRequest,
    ) -> Result<Vec<Bar>, MarketDataError>;

    /// Start delivering quote updates for `symbols` into `sink`.
    async fn subscribe_quotes(
        &self,
        symbols: &[String],
        sink: QuoteSink,
    ) -> Result<(), MarketDataError>;

    /// Stop delivering quote updates for `symbols`.
    async fn unsubscribe_quotes(&self, symbols: &[String]) -> Result<(), MarketDataError>;

    /// Whether the market served by this provider is open.
    ///
    /// Defaults to the US regular session.
    fn is_market_open(&self) -> bool {
        is_us_market_open(Utc::now())
    }
}
