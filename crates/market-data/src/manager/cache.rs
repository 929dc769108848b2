//! In-memory quote cache with TTL using moka

use std::time::Duration;

use moka::future::Cache;

use crate::models::Quote;

const MAX_CACHED_SYMBOLS: u64 = 10_000;

/// Per-symbol quote cache.
///
/// An entry is served only while it is younger than the TTL; expired entries
/// read as absent. Inserting a quote for a symbol replaces the previous one
/// and restarts its TTL.
pub struct QuoteCache {
    quotes: Cache<String, Quote>,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            quotes: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(MAX_CACHED_SYMBOLS)
                .build(),
        }
    }

    /// Get a fresh quote from cache
    pub async fn get(&self, symbol: &str) -> Option<Quote> {
        self.quotes.get(symbol).await
    }

    /// Store quote in cache
    pub async fn insert(&self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote).await;
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.quotes.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_cache_set_get() {
        let cache = QuoteCache::new(Duration::from_secs(5));

        cache
            .insert(Quote::with_last("AAPL", Utc::now(), dec!(190.25)))
            .await;

        let cached = cache.get("AAPL").await.unwrap();
        assert_eq!(cached.last, Some(dec!(190.25)));
        assert!(cache.get("MSFT").await.is_none());
    }

    #[tokio::test]
    async fn test_insert_overwrites() {
        let cache = QuoteCache::new(Duration::from_secs(5));

        cache.insert(Quote::with_last("AAPL", Utc::now(), dec!(190))).await;
        cache.insert(Quote::with_last("AAPL", Utc::now(), dec!(191))).await;

        assert_eq!(cache.get("AAPL").await.unwrap().last, Some(dec!(191)));
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = QuoteCache::new(Duration::from_millis(50));

        cache.insert(Quote::with_last("AAPL", Utc::now(), dec!(190))).await;
        assert!(cache.get("AAPL").await.is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("AAPL").await.is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = QuoteCache::new(Duration::from_secs(5));

        cache.insert(Quote::with_last("AAPL", Utc::now(), dec!(190))).await;
        cache.clear();

        assert!(cache.get("AAPL").await.is_none());
    }
}
