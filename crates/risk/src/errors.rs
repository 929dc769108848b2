//! Risk engine error types.
//!
//! [`RiskError`] is a broken precondition and is returned as `Err`.
//! [`RiskRejection`] is a signal that failed a risk rule; it travels inside
//! [`RiskCheck::Rejected`](crate::RiskCheck::Rejected) and its `Display` is
//! the human-readable reason.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid input to the risk engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Prices must be strictly positive.
    #[error("Invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: String, price: Decimal },

    /// Signal quantities cannot be negative; the side carries the direction.
    #[error("Invalid quantity for {symbol}: {quantity}")]
    InvalidQuantity { symbol: String, quantity: i64 },

    /// Order value or share count does not fit in a `Decimal`/`i64`.
    #[error("Arithmetic overflow computing {operation} for {symbol}")]
    Overflow {
        symbol: String,
        operation: &'static str,
    },

    /// Risk limits failed validation.
    #[error("Invalid risk limits: {0}")]
    InvalidLimits(String),
}

/// Why a signal was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskRejection {
    #[error("No open position to close for {symbol}")]
    NoPosition { symbol: String },

    #[error("Cannot close long position - currently short {symbol}")]
    CannotCloseLong { symbol: String },

    #[error("Cannot close short position - currently long {symbol}")]
    CannotCloseShort { symbol: String },

    #[error("Order value ${order_value:.2} exceeds max_order_value ${limit:.2}")]
    OrderValueExceeded { order_value: Decimal, limit: Decimal },

    #[error("Maximum positions ({limit}) already open (max_positions)")]
    MaxPositionsReached { limit: usize },

    #[error("Position size ${order_value:.2} exceeds max_position_size ${limit:.2}")]
    PositionSizeExceeded { order_value: Decimal, limit: Decimal },

    #[error("Total exposure ${projected:.2} would exceed max_portfolio_exposure ${limit:.2}")]
    ExposureExceeded { projected: Decimal, limit: Decimal },

    #[error(
        "Symbol concentration {:.1}% for {symbol} exceeds max_symbol_concentration {:.1}%",
        percent(.concentration),
        percent(.limit)
    )]
    ConcentrationExceeded {
        symbol: String,
        concentration: Decimal,
        limit: Decimal,
    },

    #[error("Daily loss limit reached: ${total_pnl:.2} < -${limit:.2} (max_daily_loss)")]
    DailyLossLimit { total_pnl: Decimal, limit: Decimal },
}

fn percent(fraction: &Decimal) -> Decimal {
    *fraction * Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rejection_reasons() {
        let rejection = RiskRejection::OrderValueExceeded {
            order_value: dec!(5000.01),
            limit: dec!(5000),
        };
        assert_eq!(
            rejection.to_string(),
            "Order value $5000.01 exceeds max_order_value $5000.00"
        );

        let rejection = RiskRejection::ConcentrationExceeded {
            symbol: "X".to_string(),
            concentration: dec!(0.32),
            limit: dec!(0.30),
        };
        assert_eq!(
            rejection.to_string(),
            "Symbol concentration 32.0% for X exceeds max_symbol_concentration 30.0%"
        );

        let rejection = RiskRejection::NoPosition {
            symbol: "AAPL".to_string(),
        };
        assert_eq!(rejection.to_string(), "No open position to close for AAPL");
    }

    #[test]
    fn test_error_display() {
        let error = RiskError::InvalidPrice {
            symbol: "AAPL".to_string(),
            price: dec!(0),
        };
        assert_eq!(error.to_string(), "Invalid price for AAPL: 0");
    }
}
