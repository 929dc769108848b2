//! Risk engine for pre-trade checks and loss protection.
//!
//! The engine sits between the strategies and the execution venue. It owns
//! the position ledger and the daily P&L book, validates every signal against
//! the configured [`RiskLimits`] and reports when trading must halt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::daily::DailyBook;
use crate::errors::{RiskError, RiskRejection};
use crate::limits::RiskLimits;
use crate::position::{Position, PositionLedger};
use crate::signal::{SignalType, TradingSignal};
use crate::summary::PortfolioSummary;

/// Default fraction of the per-order budget risked on one trade (2%).
pub const DEFAULT_RISK_PER_TRADE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);

/// Result of a risk check on a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskCheck {
    /// Signal may proceed to execution.
    Approved,
    /// Signal must not be executed.
    Rejected(RiskRejection),
}

impl RiskCheck {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn rejection(&self) -> Option<&RiskRejection> {
        match self {
            Self::Approved => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// "OK" when approved, otherwise the rejection reason.
    pub fn reason(&self) -> String {
        match self {
            Self::Approved => "OK".to_string(),
            Self::Rejected(rejection) => rejection.to_string(),
        }
    }
}

/// Mutable state protected by one mutex.
struct RiskState {
    ledger: PositionLedger,
    daily: DailyBook,
}

/// Stateful risk engine.
///
/// # Usage
///
/// ```rust,ignore
/// let engine = RiskEngine::new(RiskLimits::default())?;
///
/// // Keep the ledger in sync with the broker
/// engine.update_position("AAPL", 100, dec!(150), dec!(152));
///
/// // Before placing an order
/// match engine.validate_signal(&signal, price)? {
///     RiskCheck::Approved => { /* place order */ }
///     RiskCheck::Rejected(reason) => { /* log and drop */ }
/// }
///
/// // Every loop iteration
/// if engine.check_emergency_stop() {
///     /* halt trading */
/// }
/// ```
pub struct RiskEngine {
    limits: RiskLimits,
    clock: Arc<dyn Clock>,
    state: Mutex<RiskState>,
}

impl RiskEngine {
    /// Create an engine on the system clock.
    pub fn new(limits: RiskLimits) -> Result<Self, RiskError> {
        Self::with_clock(limits, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(limits: RiskLimits, clock: Arc<dyn Clock>) -> Result<Self, RiskError> {
        limits.validate()?;

        info!("Risk engine initialized with {}", limits);
        let today = clock.today();

        Ok(Self {
            limits,
            clock,
            state: Mutex::new(RiskState {
                ledger: PositionLedger::new(),
                daily: DailyBook::new(today),
            }),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RiskState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Risk state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Lock the state with the daily bucket rolled to today.
    fn current_state(&self) -> MutexGuard<'_, RiskState> {
        let mut state = self.lock_state();
        state.daily.roll_to(self.clock.today());
        state
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Record the broker's view of a position. Zero quantity closes it.
    pub fn update_position(
        &self,
        symbol: &str,
        quantity: i64,
        avg_price: Decimal,
        current_price: Decimal,
    ) {
        let position = Position {
            symbol: symbol.to_string(),
            quantity,
            avg_price,
            current_price,
            updated_at: self.clock.now(),
        };

        let mut state = self.lock_state();
        if quantity == 0 {
            if let Some(closed) = state.ledger.apply(position) {
                info!("Position closed: {}", closed);
            }
        } else {
            debug!("Position updated: {}", position);
            state.ledger.apply(position);
        }
    }

    /// Mark held positions to new prices. Symbols not held are ignored.
    pub fn update_prices(&self, prices: &HashMap<String, Decimal>) {
        let now = self.clock.now();
        let mut state = self.lock_state();
        for (symbol, price) in prices {
            state.ledger.mark(symbol, *price, now);
        }
    }

    /// Add realized P&L to today's total.
    pub fn record_realized_pnl(&self, pnl: Decimal) {
        let mut state = self.current_state();
        state.daily.record_pnl(pnl);
        info!(
            "Realized P&L: ${:.2}, Daily total: ${:.2}",
            pnl,
            state.daily.current().realized_pnl
        );
    }

    /// Count one executed trade against today.
    pub fn record_trade(&self) {
        self.current_state().daily.record_trade();
    }

    pub fn get_daily_pnl(&self) -> Decimal {
        self.current_state().daily.current().realized_pnl
    }

    pub fn get_daily_trades(&self) -> u32 {
        self.current_state().daily.current().trades
    }

    pub fn get_total_exposure(&self) -> Decimal {
        self.lock_state().ledger.total_exposure()
    }

    pub fn get_total_unrealized_pnl(&self) -> Decimal {
        self.lock_state().ledger.total_unrealized_pnl()
    }

    pub fn get_position(&self, symbol: &str) -> Option<Position> {
        self.lock_state().ledger.get(symbol).cloned()
    }

    /// Snapshot of all open positions, sorted by symbol.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.lock_state().ledger.iter().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    /// Check a signal against the risk limits.
    ///
    /// Close signals only need a matching open position. Buy and Sell run
    /// these checks in order and stop at the first failure:
    /// 1. Order value
    /// 2. Position count (new symbols only)
    /// 3. Position size
    /// 4. Portfolio exposure
    /// 5. Symbol concentration
    /// 6. Daily loss (realized today plus unrealized)
    ///
    /// A non-positive price, a negative quantity or an order value too large
    /// to represent is an error, not a rejection.
    ///
    /// Sell is taken as opening or adding to a short, so its value counts
    /// toward exposure like a Buy even when a long is held. Reducing a long
    /// goes through CloseLong.
    pub fn validate_signal(
        &self,
        signal: &TradingSignal,
        current_price: Decimal,
    ) -> Result<RiskCheck, RiskError> {
        let symbol = signal.symbol.as_str();

        if current_price <= Decimal::ZERO {
            return Err(RiskError::InvalidPrice {
                symbol: symbol.to_string(),
                price: current_price,
            });
        }
        if signal.quantity < 0 {
            return Err(RiskError::InvalidQuantity {
                symbol: symbol.to_string(),
                quantity: signal.quantity,
            });
        }

        let state = self.current_state();

        if !signal.signal_type.is_directional() {
            return Ok(check_close(&state.ledger, signal));
        }

        let limits = &self.limits;
        let order_value = Decimal::from(signal.quantity)
            .checked_mul(current_price)
            .ok_or_else(|| RiskError::Overflow {
                symbol: symbol.to_string(),
                operation: "order value",
            })?;

        if order_value > limits.max_order_value {
            return Ok(RiskCheck::Rejected(RiskRejection::OrderValueExceeded {
                order_value,
                limit: limits.max_order_value,
            }));
        }

        let held = state.ledger.get(symbol);
        if held.is_none() && state.ledger.len() >= limits.max_positions {
            return Ok(RiskCheck::Rejected(RiskRejection::MaxPositionsReached {
                limit: limits.max_positions,
            }));
        }

        if order_value > limits.max_position_size {
            return Ok(RiskCheck::Rejected(RiskRejection::PositionSizeExceeded {
                order_value,
                limit: limits.max_position_size,
            }));
        }

        let projected = state.ledger.total_exposure() + order_value;
        if projected > limits.max_portfolio_exposure {
            return Ok(RiskCheck::Rejected(RiskRejection::ExposureExceeded {
                projected,
                limit: limits.max_portfolio_exposure,
            }));
        }

        let symbol_exposure = held.map(Position::market_value).unwrap_or_default() + order_value;
        let concentration = symbol_exposure / limits.max_portfolio_exposure;
        if concentration > limits.max_symbol_concentration {
            return Ok(RiskCheck::Rejected(RiskRejection::ConcentrationExceeded {
                symbol: symbol.to_string(),
                concentration,
                limit: limits.max_symbol_concentration,
            }));
        }

        let total_pnl = state.daily.current().realized_pnl + state.ledger.total_unrealized_pnl();
        if total_pnl < -limits.max_daily_loss {
            return Ok(RiskCheck::Rejected(RiskRejection::DailyLossLimit {
                total_pnl,
                limit: limits.max_daily_loss,
            }));
        }

        Ok(RiskCheck::Approved)
    }

    /// Shares to buy at `price` when risking `risk_per_trade` of the smaller
    /// of the position-size and order-value limits.
    ///
    /// Returns at least 1 when a single share fits in that budget.
    pub fn calculate_position_size(
        &self,
        symbol: &str,
        price: Decimal,
        risk_per_trade: Decimal,
    ) -> Result<i64, RiskError> {
        if price <= Decimal::ZERO {
            return Err(RiskError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }

        let max_value = self.limits.max_position_size.min(self.limits.max_order_value);
        let mut quantity = max_value
            .checked_mul(risk_per_trade)
            .and_then(|budget| budget.checked_div(price))
            .and_then(|shares| shares.floor().to_i64())
            .ok_or_else(|| RiskError::Overflow {
                symbol: symbol.to_string(),
                operation: "position size",
            })?;
        if quantity == 0 && price < max_value {
            quantity = 1;
        }

        debug!(
            "Position sizing for {}: {} shares @ ${:.2} = ${:.2}",
            symbol,
            quantity,
            price,
            Decimal::from(quantity) * price
        );

        Ok(quantity)
    }

    /// Whether trading must halt: today's realized loss is past the daily
    /// limit, or exposure is past the portfolio limit.
    pub fn check_emergency_stop(&self) -> bool {
        let state = self.current_state();

        let daily_pnl = state.daily.current().realized_pnl;
        if daily_pnl < -self.limits.max_daily_loss {
            error!(
                "EMERGENCY STOP: Daily loss limit exceeded (${:.2} < -${:.2})",
                daily_pnl, self.limits.max_daily_loss
            );
            return true;
        }

        let exposure = state.ledger.total_exposure();
        if exposure > self.limits.max_portfolio_exposure {
            error!(
                "EMERGENCY STOP: Portfolio exposure limit exceeded (${:.2} > ${:.2})",
                exposure, self.limits.max_portfolio_exposure
            );
            return true;
        }

        false
    }

    pub fn get_portfolio_summary(&self) -> PortfolioSummary {
        let state = self.current_state();
        let today = state.daily.current();
        PortfolioSummary::build(&state.ledger, &self.limits, today.realized_pnl, today.trades)
    }
}

fn check_close(ledger: &PositionLedger, signal: &TradingSignal) -> RiskCheck {
    let position = match signal.signal_type {
        SignalType::CloseLong | SignalType::CloseShort => ledger.get(&signal.symbol),
        _ => return RiskCheck::Approved,
    };

    let symbol = signal.symbol.clone();
    let rejection = match (signal.signal_type, position) {
        (_, None) => RiskRejection::NoPosition { symbol },
        (SignalType::CloseLong, Some(p)) if !p.is_long() => {
            RiskRejection::CannotCloseLong { symbol }
        }
        (SignalType::CloseShort, Some(p)) if !p.is_short() => {
            RiskRejection::CannotCloseShort { symbol }
        }
        _ => return RiskCheck::Approved,
    };

    RiskCheck::Rejected(rejection)
}
