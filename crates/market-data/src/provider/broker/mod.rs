//! Broker-session market data provider.
//!
//! Wraps the market-data surface of a live broker session. The session owns
//! the wire protocol and its tick cache; this provider only decides when to
//! request, cancel and read market data.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use crate::errors::MarketDataError;
use crate::models::{Bar, BarRequest, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, QuoteSink};

const PROVIDER_NAME: &str = "BROKER";

/// Default wait after a new market-data request before reading the snapshot.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Market-data operations a broker session exposes.
///
/// Implemented by the broker client. Requests are fire-and-forget: ticks
/// arrive asynchronously and are folded into a per-symbol snapshot that
/// [`market_data_snapshot`](Self::market_data_snapshot) reads.
pub trait BrokerQuoteSource: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Start streaming ticks for a symbol.
    fn request_market_data(&self, symbol: &str) -> Result<(), MarketDataError>;

    /// Stop streaming ticks for a symbol.
    fn cancel_market_data(&self, symbol: &str) -> Result<(), MarketDataError>;

    /// Latest accumulated ticks for a symbol, if any have arrived.
    fn market_data_snapshot(&self, symbol: &str) -> Option<Quote>;
}

#[derive(Default)]
struct BrokerSubscriptions {
    requested: HashSet<String>,
    sinks: HashMap<String, QuoteSink>,
}

/// Market data provider backed by a broker session.
pub struct BrokerProvider {
    source: Arc<dyn BrokerQuoteSource>,
    connected: AtomicBool,
    settle_delay: Duration,
    state: Mutex<BrokerSubscriptions>,
}

impl BrokerProvider {
    pub fn new(source: Arc<dyn BrokerQuoteSource>) -> Self {
        Self::with_settle_delay(source, DEFAULT_SETTLE_DELAY)
    }

    pub fn with_settle_delay(source: Arc<dyn BrokerQuoteSource>, settle_delay: Duration) -> Self {
        Self {
            source,
            connected: AtomicBool::new(false),
            settle_delay,
            state: Mutex::new(BrokerSubscriptions::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BrokerSubscriptions> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Broker subscription lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn ensure_connected(&self) -> Result<(), MarketDataError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(MarketDataError::not_connected(PROVIDER_NAME))
        }
    }

    /// Request market data for every symbol not yet requested.
    ///
    /// Returns true if at least one new request went out.
    fn request_missing(&self, symbols: &[String]) -> Result<bool, MarketDataError> {
        let missing: Vec<&String> = {
            let state = self.lock_state();
            symbols
                .iter()
                .filter(|s| !state.requested.contains(s.as_str()))
                .collect()
        };

        for symbol in &missing {
            self.source.request_market_data(symbol)?;
            self.lock_state().requested.insert((*symbol).clone());
            debug!("Requested market data for {}", symbol);
        }

        Ok(!missing.is_empty())
    }

    /// Push the current snapshot for `symbol` to its subscriber.
    ///
    /// Called by the session's reader whenever a tick for `symbol` arrives.
    /// Returns true if a quote was delivered.
    pub fn forward_tick(&self, symbol: &str) -> bool {
        let sink = match self.lock_state().sinks.get(symbol) {
            Some(sink) => sink.clone(),
            None => return false,
        };

        let quote = match self.source.market_data_snapshot(symbol) {
            Some(quote) => quote,
            None => return false,
        };

        if sink.send(quote).is_err() {
            debug!("Subscriber for {} went away, dropping sink", symbol);
            self.lock_state().sinks.remove(symbol);
            return false;
        }
        true
    }

    /// Symbols with an outstanding market-data request.
    pub fn requested_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.lock_state().requested.iter().cloned().collect();
        symbols.sort();
        symbols
    }
}

#[async_trait]
impl MarketDataProvider for BrokerProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.source.is_connected()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_historical: false,
            supports_streaming: true,
        }
    }

    async fn connect(&self) -> Result<bool, MarketDataError> {
        if self.source.is_connected() {
            self.connected.store(true, Ordering::SeqCst);
            info!("Broker market data provider ready");
            Ok(true)
        } else {
            error!("Broker session not connected");
            Ok(false)
        }
    }

    async fn disconnect(&self) -> Result<(), MarketDataError> {
        let requested: Vec<String> = {
            let mut state = self.lock_state();
            state.sinks.clear();
            state.requested.drain().collect()
        };

        for symbol in &requested {
            if let Err(e) = self.source.cancel_market_data(symbol) {
                warn!("Failed to cancel market data for {}: {}", symbol, e);
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, MarketDataError> {
        self.ensure_connected()?;

        if self.request_missing(&[symbol.to_string()])? {
            tokio::time::sleep(self.settle_delay).await;
        }

        let quote = self.source.market_data_snapshot(symbol);
        if quote.is_none() {
            warn!("No data available for {}", symbol);
        }
        Ok(quote)
    }

    async fn get_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        self.ensure_connected()?;

        if self.request_missing(symbols)? {
            tokio::time::sleep(self.settle_delay).await;
        }

        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                self.source
                    .market_data_snapshot(symbol)
                    .map(|quote| (symbol.clone(), quote))
            })
            .collect())
    }

    async fn get_historical_bars(
        &self,
        symbol: &str,
        _request: &BarRequest,
    ) -> Result<Vec<Bar>, MarketDataError> {
        warn!(
            "Broker historical data not available for {}, use another provider",
            symbol
        );
        Ok(Vec::new())
    }

    async fn subscribe_quotes(
        &self,
        symbols: &[String],
        sink: QuoteSink,
    ) -> Result<(), MarketDataError> {
        self.ensure_connected()?;
        self.request_missing(symbols)?;

        let mut state = self.lock_state();
        for symbol in symbols {
            state.sinks.insert(symbol.clone(), sink.clone());
        }
        info!("Subscribed to {} symbols", symbols.len());
        Ok(())
    }

    async fn unsubscribe_quotes(&self, symbols: &[String]) -> Result<(), MarketDataError> {
        for symbol in symbols {
            let was_requested = {
                let mut state = self.lock_state();
                state.sinks.remove(symbol);
                state.requested.remove(symbol)
            };
            if was_requested {
                self.source.cancel_market_data(symbol)?;
            }
        }
        info!("Unsubscribed from {} symbols", symbols.len());
        Ok(())
    }
}
