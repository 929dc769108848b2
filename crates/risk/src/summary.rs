//! Read-only portfolio snapshot.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::limits::RiskLimits;
use crate::position::{Position, PositionLedger};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    pub quantity: i64,
    pub avg_price: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
}

impl From<&Position> for PositionSummary {
    fn from(position: &Position) -> Self {
        Self {
            quantity: position.quantity,
            avg_price: position.avg_price,
            current_price: position.current_price,
            market_value: position.market_value(),
            unrealized_pnl: position.unrealized_pnl(),
        }
    }
}

/// How much of each limit is in use. Ratios are used / limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitUtilization {
    pub max_position_size: Decimal,
    pub max_positions: usize,
    pub max_daily_loss: Decimal,
    pub max_portfolio_exposure: Decimal,
    pub positions_used: usize,
    pub exposure_used: Decimal,
    /// Today's realized loss as a positive number; zero on a winning day
    pub daily_loss_used: Decimal,
    pub positions_ratio: Decimal,
    pub exposure_ratio: Decimal,
    pub daily_loss_ratio: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_positions: usize,
    pub total_exposure: Decimal,
    pub unrealized_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub daily_trades: u32,
    pub positions: BTreeMap<String, PositionSummary>,
    pub limits: LimitUtilization,
}

impl PortfolioSummary {
    pub(crate) fn build(
        ledger: &PositionLedger,
        limits: &RiskLimits,
        daily_pnl: Decimal,
        daily_trades: u32,
    ) -> Self {
        let total_exposure = ledger.total_exposure();
        let daily_loss_used = (-daily_pnl).max(Decimal::ZERO);

        Self {
            total_positions: ledger.len(),
            total_exposure,
            unrealized_pnl: ledger.total_unrealized_pnl(),
            daily_pnl,
            daily_trades,
            positions: ledger
                .iter()
                .map(|p| (p.symbol.clone(), PositionSummary::from(p)))
                .collect(),
            limits: LimitUtilization {
                max_position_size: limits.max_position_size,
                max_positions: limits.max_positions,
                max_daily_loss: limits.max_daily_loss,
                max_portfolio_exposure: limits.max_portfolio_exposure,
                positions_used: ledger.len(),
                exposure_used: total_exposure,
                daily_loss_used,
                positions_ratio: Decimal::from(ledger.len())
                    / Decimal::from(limits.max_positions),
                exposure_ratio: total_exposure / limits.max_portfolio_exposure,
                daily_loss_ratio: daily_loss_used / limits.max_daily_loss,
            },
        }
    }
}
