use rust_decimal::Decimal;
use tradeguard_market_data::{Bar, Quote};
use tradeguard_risk::TradingSignal;

use crate::state::{StrategyPerformance, StrategyState};

/// A quote-driven trading strategy.
///
/// Implementors provide [`Strategy::on_quote`] and access to their
/// [`StrategyState`]; lifecycle, position tracking and performance come from
/// the shared state.
///
/// # Lifecycle
///
/// 1. `start` - the strategy begins emitting signals
/// 2. `on_quote` / `on_bar` - called for every new price
/// 3. `on_position_update` / `on_fill` - called as the broker reports
/// 4. `stop` - `on_quote` returns `None` until started again
pub trait Strategy: Send + Sync {
    fn state(&self) -> &StrategyState;

    fn state_mut(&mut self) -> &mut StrategyState;

    /// Feed a quote; returns a signal when the strategy wants to act.
    ///
    /// Inactive strategies return `None` without recording the price.
    fn on_quote(&mut self, quote: &Quote) -> Option<TradingSignal>;

    /// Feed a completed bar, treated as a quote at its close.
    fn on_bar(&mut self, bar: &Bar) -> Option<TradingSignal> {
        self.on_quote(&bar.to_quote())
    }

    fn name(&self) -> &str {
        self.state().name()
    }

    fn symbols(&self) -> &[String] {
        self.state().symbols()
    }

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn start(&mut self) {
        self.state_mut().start();
    }

    fn stop(&mut self) {
        self.state_mut().stop();
    }

    fn reset(&mut self) {
        self.state_mut().reset();
    }

    /// The broker's position for `symbol` changed. Zero means flat.
    fn on_position_update(&mut self, symbol: &str, quantity: i64, avg_price: Decimal) {
        self.state_mut().update_position(symbol, quantity, avg_price);
    }

    /// An order filled. `quantity` is positive for buys, negative for sells.
    fn on_fill(&mut self, symbol: &str, quantity: i64, price: Decimal) {
        self.state_mut().record_fill(symbol, quantity, price);
    }

    fn performance(&self) -> StrategyPerformance {
        self.state().performance()
    }
}
