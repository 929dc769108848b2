//! Yahoo Finance market data provider.
//!
//! Free, unauthenticated and delayed. Quotes come from the 1-minute chart of
//! the current day, historical bars from the chart API with the requested
//! range and interval. Yahoo has no push feed, so subscriptions are served by
//! polling (see [`YahooProvider::poll_subscriptions`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{Bar, BarRequest, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, QuoteSink};

const PROVIDER_NAME: &str = "YAHOO";

/// Upper bound on a single chart request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    connected: AtomicBool,
    subscriptions: Mutex<HashMap<String, QuoteSink>>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    ///
    /// The provider starts disconnected; call `connect` before use.
    pub fn new() -> Result<Self, MarketDataError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| {
            MarketDataError::provider(
                PROVIDER_NAME,
                format!("Failed to initialize Yahoo connector: {}", e),
            )
        })?;

        Ok(Self {
            connector,
            connected: AtomicBool::new(false),
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, HashMap<String, QuoteSink>> {
        self.subscriptions.lock().unwrap_or_else(|poisoned| {
            warn!("Yahoo subscription lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Symbols currently registered for polling.
    pub fn subscribed_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.lock_subscriptions().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Fetch a fresh quote for every subscribed symbol and push it into the
    /// symbol's sink.
    ///
    /// Call this periodically (every few seconds). Sinks whose receiver has
    /// been dropped are removed without a fetch. Returns the number of quotes
    /// delivered.
    pub async fn poll_subscriptions(&self) -> usize {
        let snapshot: Vec<(String, QuoteSink)> = {
            let mut subscriptions = self.lock_subscriptions();
            subscriptions.retain(|symbol, sink| {
                if sink.is_closed() {
                    debug!("Dropping closed subscription for {}", symbol);
                }
                !sink.is_closed()
            });
            subscriptions
                .iter()
                .map(|(symbol, sink)| (symbol.clone(), sink.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for (symbol, sink) in snapshot {
            match self.get_quote(&symbol).await {
                Ok(Some(quote)) => {
                    if sink.send(quote).is_ok() {
                        delivered += 1;
                    } else {
                        closed.push(symbol);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Polling {} failed: {}", symbol, e),
            }
        }

        if !closed.is_empty() {
            let mut subscriptions = self.lock_subscriptions();
            for symbol in &closed {
                debug!("Dropping closed subscription for {}", symbol);
                subscriptions.remove(symbol);
            }
        }

        delivered
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<yahoo::YResponse, MarketDataError> {
        if !self.is_connected() {
            return Err(MarketDataError::not_connected(PROVIDER_NAME));
        }

        let request = self.connector.get_quote_range(symbol, interval, range);
        tokio::time::timeout(REQUEST_TIMEOUT, request)
            .await
            .map_err(|_| MarketDataError::Timeout {
                provider: PROVIDER_NAME.to_string(),
            })?
            .map_err(|e| map_yahoo_error(symbol, e))
    }
}

/// Map a library error, treating "no data" answers as an unknown symbol.
fn map_yahoo_error(symbol: &str, error: yahoo::YahooError) -> MarketDataError {
    if matches!(
        error,
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult
    ) {
        MarketDataError::SymbolNotFound(symbol.to_string())
    } else {
        MarketDataError::provider(PROVIDER_NAME, error.to_string())
    }
}

fn candle_timestamp(raw: i64) -> Result<DateTime<Utc>, MarketDataError> {
    Utc.timestamp_opt(raw, 0)
        .single()
        .ok_or_else(|| MarketDataError::InvalidData {
            provider: PROVIDER_NAME.to_string(),
            message: format!("Invalid timestamp: {}", raw),
        })
}

fn candle_price(value: f64, field: &str) -> Result<Decimal, MarketDataError> {
    Decimal::from_f64_retain(value).ok_or_else(|| MarketDataError::InvalidData {
        provider: PROVIDER_NAME.to_string(),
        message: format!("Failed to convert {} price {} to Decimal", field, value),
    })
}

fn candle_to_bar(symbol: &str, candle: &yahoo::Quote) -> Result<Bar, MarketDataError> {
    Ok(Bar {
        symbol: symbol.to_string(),
        timestamp: candle_timestamp(candle.timestamp as i64)?,
        open: candle_price(candle.open, "open")?,
        high: candle_price(candle.high, "high")?,
        low: candle_price(candle.low, "low")?,
        close: candle_price(candle.close, "close")?,
        volume: candle.volume,
    })
}

/// The chart API carries no bid/ask, so the quote is the candle's OHLCV with
/// the close as last price.
fn candle_to_quote(symbol: &str, candle: &yahoo::Quote) -> Result<Quote, MarketDataError> {
    Ok(candle_to_bar(symbol, candle)?.to_quote())
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_historical: true,
            supports_streaming: false,
        }
    }

    async fn connect(&self) -> Result<bool, MarketDataError> {
        self.connected.store(true, Ordering::SeqCst);
        info!("Yahoo Finance provider ready (no auth required)");
        Ok(true)
    }

    async fn disconnect(&self) -> Result<(), MarketDataError> {
        self.connected.store(false, Ordering::SeqCst);
        self.lock_subscriptions().clear();
        Ok(())
    }

    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, MarketDataError> {
        debug!("Fetching latest quote for {} from Yahoo", symbol);

        let response = match self.fetch_chart(symbol, "1m", "1d").await {
            Ok(response) => response,
            Err(MarketDataError::SymbolNotFound(_)) => {
                warn!("No data available for {}", symbol);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let candle = match response.last_quote() {
            Ok(candle) => candle,
            Err(e) => {
                warn!("No quotes returned for {}: {}", symbol, e);
                return Ok(None);
            }
        };

        let quote = candle_to_quote(symbol, &candle)?;
        debug!("Got quote for {}: {:?}", symbol, quote.last);
        Ok(Some(quote))
    }

    async fn get_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        if !self.is_connected() {
            return Err(MarketDataError::not_connected(PROVIDER_NAME));
        }

        let results = join_all(symbols.iter().map(|symbol| self.get_quote(symbol))).await;

        let mut quotes = HashMap::with_capacity(symbols.len());
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(Some(quote)) => {
                    quotes.insert(symbol.clone(), quote);
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping {} in batch: {}", symbol, e),
            }
        }

        Ok(quotes)
    }

    async fn get_historical_bars(
        &self,
        symbol: &str,
        request: &BarRequest,
    ) -> Result<Vec<Bar>, MarketDataError> {
        debug!(
            "Fetching {} bars for {} over {} from Yahoo",
            request.interval, symbol, request.period
        );

        let response = match self
            .fetch_chart(symbol, &request.interval, &request.period)
            .await
        {
            Ok(response) => response,
            Err(MarketDataError::SymbolNotFound(_)) => {
                warn!("No historical data for {}", symbol);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let candles = match response.quotes() {
            Ok(candles) => candles,
            Err(yahoo::YahooError::NoQuotes) => {
                warn!("No historical data for {}", symbol);
                return Ok(Vec::new());
            }
            Err(e) => return Err(MarketDataError::provider(PROVIDER_NAME, e.to_string())),
        };

        let bars: Vec<Bar> = candles
            .iter()
            .filter_map(|candle| match candle_to_bar(symbol, candle) {
                Ok(bar) => Some(bar),
                Err(e) => {
                    warn!("Skipping bar due to conversion error: {}", e);
                    None
                }
            })
            .collect();

        let bars = request.truncate(bars);
        debug!("Got {} bars for {}", bars.len(), symbol);
        Ok(bars)
    }

    async fn subscribe_quotes(
        &self,
        symbols: &[String],
        sink: QuoteSink,
    ) -> Result<(), MarketDataError> {
        let mut subscriptions = self.lock_subscriptions();
        for symbol in symbols {
            subscriptions.insert(symbol.clone(), sink.clone());
        }
        info!("Subscribed to {} symbols (polling mode)", symbols.len());
        Ok(())
    }

    async fn unsubscribe_quotes(&self, symbols: &[String]) -> Result<(), MarketDataError> {
        let mut subscriptions = self.lock_subscriptions();
        for symbol in symbols {
            subscriptions.remove(symbol);
        }
        info!("Unsubscribed from {} symbols", symbols.len());
        Ok(())
    }
}
