//! Rate-of-change momentum.
//!
//! - ROC crosses above the buy threshold while flat: Buy, more confident the
//!   stronger the move
//! - ROC falls below the sell threshold while holding: CloseLong
//! - ROC collapses from strong (> 1.5%) to weak (< 0.5%) while holding:
//!   CloseLong

use std::collections::HashMap;

use chrono::Utc;
use log::debug;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tradeguard_market_data::Quote;
use tradeguard_risk::{SignalType, TradingSignal};

use crate::indicators::{momentum, roc};
use crate::state::{StrategyState, DEFAULT_HISTORY_LIMIT};
use crate::traits::Strategy;

pub const DEFAULT_PERIOD: usize = 14;
/// Percent
pub const DEFAULT_BUY_THRESHOLD: Decimal = Decimal::from_parts(20, 0, 0, false, 1);
/// Percent
pub const DEFAULT_SELL_THRESHOLD: Decimal = Decimal::from_parts(10, 0, 0, true, 1);

const STRONG_ROC: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
const WEAK_ROC: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

const BASE_BUY_CONFIDENCE: f64 = 0.7;
const MAX_BUY_CONFIDENCE: f64 = 0.9;
const REVERSAL_CONFIDENCE: f64 = 0.8;
const WEAKENING_CONFIDENCE: f64 = 0.7;

/// Indicator readings for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentumReading {
    pub roc: Option<Decimal>,
    pub momentum: Option<Decimal>,
    pub price: Option<Decimal>,
    pub prev_roc: Option<Decimal>,
    pub data_points: usize,
}

pub struct Momentum {
    state: StrategyState,
    period: usize,
    buy_threshold: Decimal,
    sell_threshold: Decimal,
    prev_roc: HashMap<String, Decimal>,
}

impl Momentum {
    /// 14-period ROC, buy above 2%, sell below -1%.
    pub fn new(symbols: Vec<String>) -> Self {
        Self::with_params(
            symbols,
            DEFAULT_PERIOD,
            DEFAULT_BUY_THRESHOLD,
            DEFAULT_SELL_THRESHOLD,
        )
    }

    /// Thresholds are in percent, e.g. `2.0` for 2%.
    pub fn with_params(
        symbols: Vec<String>,
        period: usize,
        buy_threshold: Decimal,
        sell_threshold: Decimal,
    ) -> Self {
        let period = period.max(1);
        let state = StrategyState::new(
            format!("Momentum_{}", period),
            symbols,
            DEFAULT_HISTORY_LIMIT.max(period + 1),
        );
        debug!(
            "Momentum Strategy: period={}, buy>{}%, sell<{}%",
            period, buy_threshold, sell_threshold
        );

        Self {
            state,
            period,
            buy_threshold,
            sell_threshold,
            prev_roc: HashMap::new(),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn reading(&self, symbol: &str) -> MomentumReading {
        let prices = self.state.price_history(symbol);
        MomentumReading {
            roc: roc(prices, self.period),
            momentum: momentum(prices, self.period),
            price: prices.last().copied(),
            prev_roc: self.prev_roc.get(symbol).copied(),
            data_points: prices.len(),
        }
    }

    fn buy_confidence(roc: Decimal) -> f64 {
        let boost = (roc / Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0);
        (BASE_BUY_CONFIDENCE + boost).min(MAX_BUY_CONFIDENCE)
    }
}

impl Strategy for Momentum {
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
        if prices.len() < self.period + 1 {
            debug!(
                "{}: Need {} prices, have {}",
                symbol,
                self.period + 1,
                prices.len()
            );
            return None;
        }

        let roc = roc(prices, self.period)?;
        let prev = self
            .prev_roc
            .insert(symbol.to_string(), roc)
            .unwrap_or(Decimal::ZERO);
        let holding = self.state.has_position(symbol);

        let (signal_type, confidence, reason) =
            if roc > self.buy_threshold && prev <= self.buy_threshold {
                if holding {
                    return None;
                }
                (
                    SignalType::Buy,
                    Self::buy_confidence(roc),
                    format!("Strong momentum: ROC={:.2}% > {}%", roc, self.buy_threshold),
                )
            } else if roc < self.sell_threshold && holding {
                (
                    SignalType::CloseLong,
                    REVERSAL_CONFIDENCE,
                    format!(
                        "Momentum reversal: ROC={:.2}% < {}%",
                        roc, self.sell_threshold
                    ),
                )
            } else if holding && roc < WEAK_ROC && prev > STRONG_ROC {
                (
                    SignalType::CloseLong,
                    WEAKENING_CONFIDENCE,
                    format!("Momentum weakening: ROC={:.2}% (was {:.2}%)", roc, prev),
                )
            } else {
                return None;
            };

        let signal = TradingSignal::new(symbol, signal_type, price, Utc::now())
            .with_confidence(confidence)
            .with_reason(reason);
        Some(self.state.emit(signal))
    }

    fn reset(&mut self) {
        self.prev_roc.clear();
        self.state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn strategy() -> Momentum {
        let mut strategy =
            Momentum::with_params(vec!["AAPL".to_string()], 2, dec!(2.0), dec!(-1.0));
        strategy.start();
        strategy
    }

    fn feed(strategy: &mut Momentum, prices: &[Decimal]) -> Vec<TradingSignal> {
        prices
            .iter()
            .filter_map(|p| strategy.on_quote(&Quote::with_last("AAPL", Utc::now(), *p)))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let strategy = Momentum::new(vec![]);
        assert_eq!(strategy.period(), 14);
        assert_eq!(strategy.name(), "Momentum_14");
        assert_eq!(DEFAULT_BUY_THRESHOLD, dec!(2.0));
        assert_eq!(DEFAULT_SELL_THRESHOLD, dec!(-1.0));
    }

    #[test]
    fn test_strong_momentum_buys_when_flat() {
        let mut strategy = strategy();

        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(103)]);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::Buy);
        assert!((signals[0].confidence - 0.73).abs() < 1e-9);
        assert_eq!(signals[0].reason, "Strong momentum: ROC=3.00% > 2.0%");
    }

    #[test]
    fn test_buy_confidence_is_capped() {
        let mut strategy = strategy();

        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(150)]);

        assert_eq!(signals[0].confidence, 0.9);
    }

    #[test]
    fn test_buy_requires_threshold_crossing() {
        let mut strategy = strategy();

        // ROC stays above the threshold on the second reading
        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(103), dec!(106)]);
        assert_eq!(signals.len(), 1);
    }

    #[test]
    fn test_strong_momentum_ignored_when_holding() {
        let mut strategy = strategy();
        strategy.on_position_update("AAPL", 10, dec!(100));

        assert!(feed(&mut strategy, &[dec!(100), dec!(100), dec!(103)]).is_empty());
    }

    #[test]
    fn test_negative_momentum_closes_position() {
        let mut strategy = strategy();
        strategy.on_position_update("AAPL", 10, dec!(100));

        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(98)]);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::CloseLong);
        assert_eq!(signals[0].confidence, 0.8);
    }

    #[test]
    fn test_negative_momentum_ignored_when_flat() {
        let mut strategy = strategy();
        assert!(feed(&mut strategy, &[dec!(100), dec!(100), dec!(98)]).is_empty());
    }

    #[test]
    fn test_weakening_momentum_closes_position() {
        let mut strategy = strategy();
        strategy.on_position_update("AAPL", 10, dec!(100));

        // ROC 2.0 (not above the buy threshold), then 0.2
        let signals = feed(&mut strategy, &[dec!(100), dec!(100), dec!(102), dec!(100.2)]);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal_type, SignalType::CloseLong);
        assert_eq!(signals[0].confidence, 0.7);
        assert!(signals[0].reason.starts_with("Momentum weakening"));
    }

    #[test]
    fn test_zero_base_price_yields_no_signal() {
        let mut strategy = strategy();

        assert!(feed(&mut strategy, &[dec!(0), dec!(1), dec!(5)]).is_empty());

        let reading = strategy.reading("AAPL");
        assert_eq!(reading.roc, None);
        assert_eq!(reading.momentum, Some(dec!(5)));
        assert_eq!(reading.prev_roc, None);
        assert_eq!(reading.data_points, 3);
    }

    #[test]
    fn test_quote_without_price_is_ignored() {
        let mut strategy = strategy();

        assert!(strategy.on_quote(&Quote::new("AAPL", Utc::now())).is_none());
        assert_eq!(strategy.reading("AAPL").data_points, 0);
    }
}
