//! Trading strategies for TradeGuard.
//!
//! Strategies consume quotes (or bars) and emit [`TradingSignal`]s. They never
//! place orders themselves: every signal is handed to the risk engine first.
//!
//! ```text
//! Quote ──► Strategy::on_quote ──► TradingSignal ──► RiskEngine::validate_signal
//!                 ▲
//!   on_fill / on_position_update (broker events)
//! ```
//!
//! Two strategies are provided:
//! - [`MovingAverageCrossover`]: SMA golden/death cross
//! - [`Momentum`]: rate-of-change breakout and reversal

pub mod indicators;
mod momentum;
mod moving_average;
mod state;
mod traits;

pub use momentum::{
    Momentum, MomentumReading, DEFAULT_BUY_THRESHOLD, DEFAULT_PERIOD, DEFAULT_SELL_THRESHOLD,
};
pub use moving_average::{MovingAverageCrossover, DEFAULT_LONG_PERIOD, DEFAULT_SHORT_PERIOD};
pub use state::{StrategyPerformance, StrategyState, DEFAULT_HISTORY_LIMIT};
pub use traits::Strategy;

pub use tradeguard_risk::{SignalType, TradingSignal};
