//! Risk limit configuration.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::RiskError;

/// Limits every directional signal is checked against.
///
/// Monetary limits are in account currency. Limits are fixed for the
/// lifetime of a [`RiskEngine`](crate::RiskEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLimits {
    /// Maximum value of a single position-building order.
    pub max_position_size: Decimal,

    /// Maximum number of symbols held at once.
    pub max_positions: usize,

    /// Maximum combined realized and unrealized loss for the day.
    pub max_daily_loss: Decimal,

    /// Maximum value of a single order.
    pub max_order_value: Decimal,

    /// Maximum sum of absolute position values.
    pub max_portfolio_exposure: Decimal,

    /// Maximum share of `max_portfolio_exposure` one symbol may take, in (0, 1].
    pub max_symbol_concentration: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: Decimal::from(10_000),
            max_positions: 5,
            max_daily_loss: Decimal::from(500),
            max_order_value: Decimal::from(5_000),
            max_portfolio_exposure: Decimal::from(50_000),
            // 30%
            max_symbol_concentration: Decimal::new(30, 2),
        }
    }
}

impl RiskLimits {
    /// Check that every limit is usable.
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<(), RiskError> {
        let mut problems = Vec::new();

        let monetary = [
            ("max_position_size", self.max_position_size),
            ("max_daily_loss", self.max_daily_loss),
            ("max_order_value", self.max_order_value),
            ("max_portfolio_exposure", self.max_portfolio_exposure),
        ];
        for (name, value) in monetary {
            if value <= Decimal::ZERO {
                problems.push(format!("{} must be positive, got {}", name, value));
            }
        }

        if self.max_positions == 0 {
            problems.push("max_positions must be at least 1".to_string());
        }

        if self.max_symbol_concentration <= Decimal::ZERO
            || self.max_symbol_concentration > Decimal::ONE
        {
            problems.push(format!(
                "max_symbol_concentration must be in (0, 1], got {}",
                self.max_symbol_concentration
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RiskError::InvalidLimits(problems.join("; ")))
        }
    }
}

impl fmt::Display for RiskLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RiskLimits(max_pos=${:.0}, max_positions={}, max_daily_loss=${:.0})",
            self.max_position_size, self.max_positions, self.max_daily_loss
        )
    }
}
