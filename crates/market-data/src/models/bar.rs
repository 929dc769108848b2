use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quote::Quote;

/// OHLCV bar
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl Bar {
    /// View the bar as a quote priced at its close.
    pub fn to_quote(&self) -> Quote {
        Quote {
            last: Some(self.close),
            open: Some(self.open),
            high: Some(self.high),
            low: Some(self.low),
            volume: Some(self.volume),
            ..Quote::new(self.symbol.clone(), self.timestamp)
        }
    }
}

/// Parameters for a historical bar request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarRequest {
    /// Lookback window, e.g. "1d", "5d", "1mo", "1y"
    pub period: String,

    /// Bar size, e.g. "1m", "5m", "1h", "1d"
    pub interval: String,

    /// Maximum number of bars; the most recent are kept
    pub limit: usize,
}

impl BarRequest {
    pub fn new(period: impl Into<String>, interval: impl Into<String>, limit: usize) -> Self {
        Self {
            period: period.into(),
            interval: interval.into(),
            limit,
        }
    }

    /// Keep only the most recent `limit` bars.
    pub fn truncate(&self, mut bars: Vec<Bar>) -> Vec<Bar> {
        if bars.len() > self.limit {
            bars.drain(..bars.len() - self.limit);
        }
        bars
    }
}

impl Default for BarRequest {
    fn default() -> Self {
        Self::new("1d", "1m", 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn bar_at(minute: i64) -> Bar {
        Bar {
            symbol: "SPY".to_string(),
            timestamp: Utc::now() + Duration::minutes(minute),
            open: dec!(500),
            high: dec!(502),
            low: dec!(499),
            close: Decimal::from(500 + minute),
            volume: 1_000,
        }
    }

    #[test]
    fn test_to_quote_uses_close_as_last() {
        let bar = bar_at(1);
        let quote = bar.to_quote();
        assert_eq!(quote.symbol, "SPY");
        assert_eq!(quote.last, Some(dec!(501)));
        assert_eq!(quote.high, Some(dec!(502)));
        assert_eq!(quote.volume, Some(1_000));
        assert_eq!(quote.timestamp, bar.timestamp);
    }

    #[test]
    fn test_truncate_keeps_most_recent() {
        let bars: Vec<Bar> = (0..5).map(bar_at).collect();
        let request = BarRequest::new("1d", "1m", 3);
        let kept = request.truncate(bars);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].close, dec!(502));
        assert_eq!(kept[2].close, dec!(504));
    }

    #[test]
    fn test_default_request() {
        let request = BarRequest::default();
        assert_eq!(request.period, "1d");
        assert_eq!(request.interval, "1m");
        assert_eq!(request.limit, 100);
    }
}
