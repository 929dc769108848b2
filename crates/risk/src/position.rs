//! Per-symbol position tracking.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An open position as last reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    /// Signed share count; negative is short
    pub quantity: i64,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Absolute value of the position at the current price.
    pub fn market_value(&self) -> Decimal {
        (Decimal::from(self.quantity) * self.current_price).abs()
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        Decimal::from(self.quantity) * (self.current_price - self.avg_price)
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.is_long() { "LONG" } else { "SHORT" };
        write!(
            f,
            "Position({} {} {} @ ${:.2}, MV=${:.2}, PnL=${:.2})",
            direction,
            self.quantity.unsigned_abs(),
            self.symbol,
            self.avg_price,
            self.market_value(),
            self.unrealized_pnl()
        )
    }
}

/// Open positions keyed by symbol. A symbol is present iff its quantity is
/// nonzero.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: HashMap<String, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the position for `position.symbol`, or remove it
    /// when the quantity is zero.
    ///
    /// Returns the removed position when one was closed.
    pub fn apply(&mut self, position: Position) -> Option<Position> {
        if position.quantity == 0 {
            self.positions.remove(&position.symbol)
        } else {
            self.positions.insert(position.symbol.clone(), position);
            None
        }
    }

    /// Overwrite the current price of a held symbol. Returns false if the
    /// symbol is not held.
    pub fn mark(&mut self, symbol: &str, price: Decimal, at: DateTime<Utc>) -> bool {
        match self.positions.get_mut(symbol) {
            Some(position) => {
                position.current_price = price;
                position.updated_at = at;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Sum of absolute position values.
    pub fn total_exposure(&self) -> Decimal {
        self.iter().map(Position::market_value).sum()
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.iter().map(Position::unrealized_pnl).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, quantity: i64, avg: Decimal, current: Decimal) -> Position {
        Position {
            symbol: symbol.to_string(),
            quantity,
            avg_price: avg,
            current_price: current,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_long_position_values() {
        let pos = position("AAPL", 100, dec!(150), dec!(155.50));
        assert_eq!(pos.market_value(), dec!(15550));
        assert_eq!(pos.unrealized_pnl(), dec!(550));
        assert!(pos.is_long());
        assert!(!pos.is_short());
    }

    #[test]
    fn test_short_position_values() {
        let pos = position("TSLA", -10, dec!(200), dec!(210));
        assert_eq!(pos.market_value(), dec!(2100));
        assert_eq!(pos.unrealized_pnl(), dec!(-100));
        assert!(pos.is_short());
    }

    #[test]
    fn test_display() {
        let pos = position("AAPL", -5, dec!(100), dec!(90));
        assert_eq!(
            pos.to_string(),
            "Position(SHORT 5 AAPL @ $100.00, MV=$450.00, PnL=$50.00)"
        );
    }

    #[test]
    fn test_ledger_last_write_wins_and_zero_removes() {
        let mut ledger = PositionLedger::new();

        assert!(ledger.apply(position("AAPL", 10, dec!(100), dec!(100))).is_none());
        ledger.apply(position("AAPL", 25, dec!(102), dec!(103)));
        assert_eq!(ledger.get("AAPL").unwrap().quantity, 25);
        assert_eq!(ledger.len(), 1);

        let closed = ledger.apply(position("AAPL", 0, dec!(0), dec!(103)));
        assert_eq!(closed.unwrap().quantity, 25);
        assert!(!ledger.contains("AAPL"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_mark_only_touches_held_symbols() {
        let mut ledger = PositionLedger::new();
        ledger.apply(position("AAPL", 10, dec!(100), dec!(100)));

        assert!(ledger.mark("AAPL", dec!(110), Utc::now()));
        assert!(!ledger.mark("MSFT", dec!(300), Utc::now()));

        assert_eq!(ledger.get("AAPL").unwrap().current_price, dec!(110));
        assert!(!ledger.contains("MSFT"));
    }

    #[test]
    fn test_totals() {
        let mut ledger = PositionLedger::new();
        ledger.apply(position("AAPL", 10, dec!(100), dec!(110)));
        ledger.apply(position("TSLA", -5, dec!(200), dec!(190)));

        assert_eq!(ledger.total_exposure(), dec!(2050));
        assert_eq!(ledger.total_unrealized_pnl(), dec!(150));
    }
}
