use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time market quote for a single symbol.
///
/// Quotes are snapshots: a newer quote for the same symbol replaces the old
/// one rather than mutating it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol
    pub symbol: String,

    /// Time the quote was observed
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,

    /// Last traded price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,

    /// Previous session close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<Decimal>,
}

impl Quote {
    /// Create an empty quote for a symbol; fill in the fields you have.
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            bid: None,
            ask: None,
            last: None,
            bid_size: None,
            ask_size: None,
            volume: None,
            high: None,
            low: None,
            open: None,
            close: None,
        }
    }

    /// Create a quote carrying only a last traded price.
    pub fn with_last(symbol: impl Into<String>, timestamp: DateTime<Utc>, last: Decimal) -> Self {
        Self {
            last: Some(last),
            ..Self::new(symbol, timestamp)
        }
    }

    /// Midpoint of bid and ask, or the last price when either side is missing.
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => self.last,
        }
    }

    /// Bid-ask spread; undefined unless both sides are quoted.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// The price to act on: last trade, falling back to the midpoint.
    pub fn price(&self) -> Option<Decimal> {
        self.last.or_else(|| self.mid_price())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote() -> Quote {
        Quote::new("AAPL", Utc::now())
    }

    #[test]
    fn test_mid_price_uses_bid_and_ask() {
        let q = Quote {
            bid: Some(dec!(100.10)),
            ask: Some(dec!(100.30)),
            last: Some(dec!(99)),
            ..quote()
        };
        assert_eq!(q.mid_price(), Some(dec!(100.20)));
        assert_eq!(q.spread(), Some(dec!(0.20)));
    }

    #[test]
    fn test_mid_price_falls_back_to_last() {
        let q = Quote {
            bid: Some(dec!(100.10)),
            last: Some(dec!(100.25)),
            ..quote()
        };
        assert_eq!(q.mid_price(), Some(dec!(100.25)));
        assert_eq!(q.spread(), None);

        let q = Quote {
            ask: Some(dec!(100.30)),
            ..quote()
        };
        assert_eq!(q.mid_price(), None);
    }

    #[test]
    fn test_price_prefers_last() {
        let q = Quote {
            bid: Some(dec!(10)),
            ask: Some(dec!(12)),
            last: Some(dec!(10.5)),
            ..quote()
        };
        assert_eq!(q.price(), Some(dec!(10.5)));

        let q = Quote {
            bid: Some(dec!(10)),
            ask: Some(dec!(12)),
            ..quote()
        };
        assert_eq!(q.price(), Some(dec!(11)));
    }

    #[test]
    fn test_with_last() {
        let q = Quote::with_last("MSFT", Utc::now(), dec!(412.5));
        assert_eq!(q.symbol, "MSFT");
        assert_eq!(q.last, Some(dec!(412.5)));
        assert!(q.bid.is_none());
    }
}
