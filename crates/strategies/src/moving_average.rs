//! Moving average crossover.
//!
//! - Golden cross (short SMA moves above long SMA) while flat: Buy
//! - Death cross (short SMA moves below long SMA) while holding: CloseLong

use std::collections::HashMap;

use chrono::Utc;
use log::debug;
use rust_decimal::Decimal;
use tradeguard_market_data::Quote;
use tradeguard_risk::{SignalType, TradingSignal};

use crate::indicators::sma;
use crate::state::{StrategyState, DEFAULT_HISTORY_LIMIT};
use crate::traits::Strategy;

pub const DEFAULT_SHORT_PERIOD: usize = 20;
pub const DEFAULT_LONG_PERIOD: usize = 50;

const CROSS_CONFIDENCE: f64 = 0.8;

/// Last computed (short, long) averages for a symbol.
#[derive(Debug, Clone, Copy)]
struct Averages {
    short: Decimal,
    long: Decimal,
}

pub struct MovingAverageCrossover {
    state: StrategyState,
    short_period: usize,
    long_period: usize,
    previous: HashMap<String, Averages>,
}

impl MovingAverageCrossover {
    /// 20/50 crossover.
    pub fn new(symbols: Vec<String>) -> Self {
        Self::with_periods(symbols, DEFAULT_SHORT_PERIOD, DEFAULT_LONG_PERIOD)
    }

    /// Periods are at least 1, and the long period is always longer than the
    /// short one.
    pub fn with_periods(symbols: Vec<String>, short_period: usize, long_period: usize) -> Self {
        let short_period = short_period.max(1);
        let long_period = long_period.max(short_period + 1);

        let name = format!("MA_Cross_{}_{}", short_period, long_period);
        let state = StrategyState::new(name, symbols, DEFAULT_HISTORY_LIMIT.max(long_period));
        debug!("MA Crossover Strategy: {}/{}", short_period, long_period);

        Self {
            state,
            short_period,
            long_period,
            previous: HashMap::new(),
        }
    }

    pub fn short_period(&self) -> usize {
        self.short_period
    }

    pub fn long_period(&self) -> usize {
        self.long_period
    }

    /// Current (short, long) averages for a symbol, if there is enough data.
    pub fn averages(&self, symbol: &str) -> Option<(Decimal, Decimal)> {
        let prices = self.state.price_history(symbol);
        Some((sma(prices, self.short_period)?, sma(prices, self.long_period)?))
    }
}

impl Strategy for MovingAverageCrossover {
    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StrategyState {
        &mut self.state
    }

    fn on_quote(&mut self, quote: &Quote) -> Option<TradingSignal> {
        if !self.state.is_active() {
            return None;
        }
        let symbol = quote.symbol.as_str();
        let price = quote.price()?;

        let prices = self.state.add_price(symbol, price);
        if prices.len() < self.long_period {
            debug!(
                "{}: Need {} prices, have {}",
                symbol,
                self.long_period,
                prices.len()
            );
            return None;
        }

        let current = Averages {
            short: sma(prices, self.short_period)?,
            long: sma(prices, self.long_period)?,
        };
        let previous = self.previous.insert(symbol.to_string(), current)?;

        let golden = previous.short <= previous.long && current.short > current.long;
        let death = previous.short >= previous.long && current.short < current.long;
        let holding = self.state.has_position(symbol);

        let (signal_type, label) = if golden {
            if holding {
                return None;
            }
            (SignalType::Buy, "Golden Cross")
        } else if death {
            if !holding {
                return None;
            }
            (SignalType::CloseLong, "Death Cross")
        } else {
            return None;
        };

        let comparison = if golden { ">" } else { "<" };
        let reason = format!(
            "{}: MA{}={:.2} {} MA{}={:.2}",
            label, self.short_period, current.short, comparison, self.long_period, current.long
        );

        let signal = TradingSignal::new(symbol, signal_type, price, Utc::now())
            .with_confidence(CROSS_CONFIDENCE)
            .with_reason(reason);
        Some(self.state.emit(signal))
    }

    fn reset(&mut self) {
        self.previous.clear();
        self.state.reset();
    }
}
