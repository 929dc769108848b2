//! Trading signals produced by strategies and gated by the risk engine.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
    CloseLong,
    CloseShort,
}

impl SignalType {
    /// Buy and Sell open or add to exposure; the others do not.
    pub fn is_directional(self) -> bool {
        matches!(self, Self::Buy | Self::Sell)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
            Self::CloseLong => write!(f, "CLOSE_LONG"),
            Self::CloseShort => write!(f, "CLOSE_SHORT"),
        }
    }
}

/// A strategy's trade decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignal {
    pub symbol: String,
    pub signal_type: SignalType,
    pub timestamp: DateTime<Utc>,
    /// Price the decision was made at
    pub price: Decimal,
    /// Shares to trade; 0 leaves sizing to the caller
    pub quantity: i64,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reason: String,
}

impl TradingSignal {
    pub fn new(
        symbol: impl Into<String>,
        signal_type: SignalType,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            signal_type,
            timestamp,
            price,
            quantity: 0,
            confidence: 0.0,
            reason: String::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

impl fmt::Display for TradingSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Signal({} {} @ ${:.2}, conf={:.2}, reason='{}')",
            self.signal_type, self.symbol, self.price, self.confidence, self.reason
        )
    }
}
