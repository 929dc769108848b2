//! TradeGuard Risk Crate
//!
//! Pre-trade risk validation and position accounting.
//!
//! # Overview
//!
//! - [`RiskEngine`] validates [`TradingSignal`]s against [`RiskLimits`] and
//!   decides when trading must stop
//! - [`PositionLedger`] tracks open positions with market value and
//!   unrealized P&L
//! - [`DailyBook`] accumulates realized P&L and trade count for the current
//!   trading date, rolling over lazily when the [`Clock`] says the day changed
//!
//! The engine is synchronous and guards its state with a single mutex, so it
//! can be shared across tasks behind an `Arc`.

mod clock;
mod daily;
mod engine;
mod errors;
mod limits;
mod position;
mod signal;
mod summary;

#[cfg(test)]
mod engine_tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use daily::{DailyBook, DailyRecord};
pub use engine::{RiskCheck, RiskEngine, DEFAULT_RISK_PER_TRADE};
pub use errors::{RiskError, RiskRejection};
pub use limits::RiskLimits;
pub use position::{Position, PositionLedger};
pub use signal::{SignalType, TradingSignal};
pub use summary::{LimitUtilization, PortfolioSummary, PositionSummary};
