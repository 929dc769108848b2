//! Bookkeeping shared by every strategy: positions, price history, signal
//! history and trade performance.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use tradeguard_risk::TradingSignal;

/// Prices kept per symbol when a strategy does not ask for more.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// Signals kept for inspection; older ones are dropped first.
const MAX_SIGNAL_HISTORY: usize = 1_000;

/// Performance snapshot of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPerformance {
    pub strategy_name: String,
    pub is_active: bool,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Percent of fills that closed at a profit
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    pub current_positions: BTreeMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct StrategyState {
    name: String,
    symbols: Vec<String>,
    active: bool,
    history_limit: usize,
    positions: HashMap<String, i64>,
    entry_prices: HashMap<String, Decimal>,
    price_history: HashMap<String, Vec<Decimal>>,
    signal_history: Vec<TradingSignal>,
    total_trades: u32,
    winning_trades: u32,
    losing_trades: u32,
    total_pnl: Decimal,
}

impl StrategyState {
    /// State for a strategy trading `symbols`, keeping at most
    /// `history_limit` prices per symbol.
    pub fn new(name: impl Into<String>, symbols: Vec<String>, history_limit: usize) -> Self {
        let name = name.into();
        info!("Initialized strategy '{}' for symbols: {:?}", name, symbols);

        Self {
            price_history: empty_history(&symbols),
            name,
            symbols,
            active: false,
            history_limit: history_limit.max(1),
            positions: HashMap::new(),
            entry_prices: HashMap::new(),
            signal_history: Vec::new(),
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            total_pnl: Decimal::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        self.active = true;
        info!("Strategy '{}' started", self.name);
    }

    pub fn stop(&mut self) {
        self.active = false;
        info!("Strategy '{}' stopped", self.name);
    }

    /// Forget positions, history and performance. Activity is unchanged.
    pub fn reset(&mut self) {
        self.positions.clear();
        self.entry_prices.clear();
        self.price_history = empty_history(&self.symbols);
        self.signal_history.clear();
        self.total_trades = 0;
        self.winning_trades = 0;
        self.losing_trades = 0;
        self.total_pnl = Decimal::ZERO;
        info!("Strategy '{}' reset", self.name);
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.position(symbol) != 0
    }

    pub fn entry_price(&self, symbol: &str) -> Option<Decimal> {
        self.entry_prices.get(symbol).copied()
    }

    /// Record the broker's position. A flat position forgets the entry price.
    pub fn update_position(&mut self, symbol: &str, quantity: i64, avg_price: Decimal) {
        let old = self.positions.insert(symbol.to_string(), quantity).unwrap_or(0);

        if quantity != 0 {
            self.entry_prices.insert(symbol.to_string(), avg_price);
        } else {
            self.entry_prices.remove(symbol);
        }

        info!(
            "[{}] Position updated: {} {} -> {} @ ${:.2}",
            self.name, symbol, old, quantity, avg_price
        );
    }

    /// Count a fill. A fill against the held direction realizes
    /// `closed_qty * (price - entry) * direction`.
    ///
    /// `quantity` is signed: positive bought, negative sold. The position
    /// itself is updated separately by [`Self::update_position`].
    pub fn record_fill(&mut self, symbol: &str, quantity: i64, price: Decimal) {
        self.total_trades += 1;

        let held = self.position(symbol);
        if let Some(entry) = self.entry_price(symbol) {
            let reduces = (held > 0 && quantity < 0) || (held < 0 && quantity > 0);
            if reduces {
                let closed = quantity.unsigned_abs().min(held.unsigned_abs());
                let direction = Decimal::from(held.signum());
                let pnl = Decimal::from(closed) * (price - entry) * direction;

                self.total_pnl += pnl;
                if pnl > Decimal::ZERO {
                    self.winning_trades += 1;
                    info!("[{}] Winning trade: ${:.2} on {}", self.name, pnl, symbol);
                } else {
                    self.losing_trades += 1;
                    info!("[{}] Losing trade: ${:.2} on {}", self.name, pnl, symbol);
                }
            }
        }

        info!("[{}] Fill: {} {} @ ${:.2}", self.name, quantity, symbol, price);
    }

    /// Append a price for a traded symbol. Prices for other symbols are
    /// ignored. Returns the symbol's history after the append.
    pub fn add_price(&mut self, symbol: &str, price: Decimal) -> &[Decimal] {
        match self.price_history.get_mut(symbol) {
            Some(history) => {
                history.push(price);
                if history.len() > self.history_limit {
                    let excess = history.len() - self.history_limit;
                    history.drain(..excess);
                }
                history.as_slice()
            }
            None => {
                debug!("[{}] Ignoring price for untracked {}", self.name, symbol);
                &[][..]
            }
        }
    }

    pub fn price_history(&self, symbol: &str) -> &[Decimal] {
        self.price_history
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Keep and log an emitted signal, handing it back to the caller.
    pub fn emit(&mut self, signal: TradingSignal) -> TradingSignal {
        info!("[{}] Signal generated: {}", self.name, signal);

        if self.signal_history.len() >= MAX_SIGNAL_HISTORY {
            self.signal_history.remove(0);
        }
        self.signal_history.push(signal.clone());
        signal
    }

    pub fn signal_history(&self) -> &[TradingSignal] {
        &self.signal_history
    }

    pub fn performance(&self) -> StrategyPerformance {
        let (win_rate, avg_pnl) = if self.total_trades > 0 {
            (
                f64::from(self.winning_trades) / f64::from(self.total_trades) * 100.0,
                self.total_pnl / Decimal::from(self.total_trades),
            )
        } else {
            (0.0, Decimal::ZERO)
        };

        StrategyPerformance {
            strategy_name: self.name.clone(),
            is_active: self.active,
            total_trades: self.total_trades,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            win_rate,
            total_pnl: self.total_pnl,
            avg_pnl,
            current_positions: self
                .positions
                .iter()
                .map(|(symbol, quantity)| (symbol.clone(), *quantity))
                .collect(),
        }
    }
}

fn empty_history(symbols: &[String]) -> HashMap<String, Vec<Decimal>> {
    symbols.iter().map(|s| (s.clone(), Vec::new())).collect()
}
