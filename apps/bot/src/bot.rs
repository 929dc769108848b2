//! Trading loop: quotes in, risk-checked orders out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tradeguard_market_data::{MarketDataManager, Quote};
use tradeguard_risk::{
    RiskCheck, RiskEngine, RiskError, SignalType, TradingSignal, DEFAULT_RISK_PER_TRADE,
};
use tradeguard_strategies::Strategy;

use crate::venue::{BrokerEvent, ExecutionVenue, Order, OrderSide, OrderStatus, OrderType};

/// How often the status block is logged while running.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

pub type SharedStrategies = Arc<Mutex<Vec<Box<dyn Strategy>>>>;

fn lock_strategies(
    strategies: &Mutex<Vec<Box<dyn Strategy>>>,
) -> MutexGuard<'_, Vec<Box<dyn Strategy>>> {
    strategies.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Strategies mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

#[derive(Debug, Clone)]
pub struct BotOptions {
    pub symbols: Vec<String>,
    pub update_interval: Duration,
    pub enable_trading: bool,
    pub order_type: OrderType,
}

pub struct TradingBot {
    options: BotOptions,
    manager: Arc<MarketDataManager>,
    risk: Arc<RiskEngine>,
    strategies: SharedStrategies,
    venue: Arc<dyn ExecutionVenue>,
    events: Option<UnboundedReceiver<BrokerEvent>>,
    event_task: Option<JoinHandle<()>>,
    running: bool,
}

impl TradingBot {
    pub fn new(
        options: BotOptions,
        manager: Arc<MarketDataManager>,
        risk: Arc<RiskEngine>,
        strategies: Vec<Box<dyn Strategy>>,
        venue: Arc<dyn ExecutionVenue>,
        events: UnboundedReceiver<BrokerEvent>,
    ) -> Self {
        tracing::info!(
            "Trading bot initialized with {} strategies on venue {}",
            strategies.len(),
            venue.name()
        );
        Self {
            options,
            manager,
            risk,
            strategies: Arc::new(Mutex::new(strategies)),
            venue,
            events: Some(events),
            event_task: None,
            running: false,
        }
    }

    /// Connect market data, seed the risk ledger from the venue, start the
    /// broker event reader and the strategies.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        tracing::info!("Connecting market data providers...");
        if !self.manager.connect().await {
            bail!("Failed to connect to any market data provider");
        }

        tracing::info!("Requesting current positions...");
        let positions = self
            .venue
            .positions()
            .await
            .context("Failed to load positions from the execution venue")?;
        for position in positions {
            // marked at cost until the first quote arrives
            self.risk.update_position(
                &position.symbol,
                position.quantity,
                position.avg_price,
                position.avg_price,
            );
            for strategy in lock_strategies(&self.strategies).iter_mut() {
                strategy.on_position_update(
                    &position.symbol,
                    position.quantity,
                    position.avg_price,
                );
            }
        }

        if let Some(events) = self.events.take() {
            self.event_task = Some(tokio::spawn(pump_events(
                events,
                self.risk.clone(),
                self.strategies.clone(),
            )));
        }

        for strategy in lock_strategies(&self.strategies).iter_mut() {
            strategy.start();
        }

        self.running = true;
        tracing::info!("Bot initialization complete");
        Ok(())
    }

    /// Run until Ctrl-C or an emergency stop, then shut down.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        if !self.running {
            bail!("Bot must be initialized before running");
        }
        if !self.options.enable_trading {
            tracing::warn!("TRADING IS DISABLED - running in monitor mode only");
        }
        tracing::info!(
            "Bot started, update interval {}s, monitoring {} symbols: {:?}",
            self.options.update_interval.as_secs(),
            self.options.symbols.len(),
            self.options.symbols
        );

        let mut update = tokio::time::interval(self.options.update_interval);
        let mut status = tokio::time::interval(STATUS_INTERVAL);
        // the first tick of an interval completes immediately
        status.tick().await;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                result = &mut ctrl_c => {
                    if let Err(e) = result {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                    tracing::info!("Received Ctrl-C, initiating shutdown");
                    break;
                }
                _ = update.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }
                _ = status.tick() => self.log_status(),
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// One loop iteration. Returns false when trading must halt.
    pub async fn tick(&self) -> bool {
        if self.risk.check_emergency_stop() {
            tracing::error!("Emergency stop triggered - shutting down");
            return false;
        }

        let quotes = self.manager.get_quotes(&self.options.symbols, false).await;
        for symbol in &self.options.symbols {
            if let Some(quote) = quotes.get(symbol) {
                self.process_quote(quote).await;
            }
        }
        true
    }

    /// Mark the ledger and run the quote through every active strategy.
    pub async fn process_quote(&self, quote: &Quote) {
        let Some(price) = quote.price() else {
            return;
        };
        self.risk
            .update_prices(&HashMap::from([(quote.symbol.clone(), price)]));

        let signals: Vec<TradingSignal> = lock_strategies(&self.strategies)
            .iter_mut()
            .filter(|s| s.is_active())
            .filter_map(|s| s.on_quote(quote))
            .collect();

        for signal in signals {
            self.execute_signal(&signal).await;
        }
    }

    /// Size a signal, validate the sized signal and, if approved, place its
    /// order.
    ///
    /// Returns the venue's order id when an order was placed.
    pub async fn execute_signal(&self, signal: &TradingSignal) -> Option<u64> {
        if !self.options.enable_trading {
            tracing::warn!("Trading disabled - signal ignored: {}", signal);
            return None;
        }

        let Some(side) = OrderSide::for_signal(signal.signal_type) else {
            tracing::debug!("No order for {}", signal);
            return None;
        };

        let sized = match self.size_signal(signal) {
            Ok(sized) => sized,
            Err(e) => {
                tracing::error!("Failed to size {}: {}", signal, e);
                return None;
            }
        };

        match self.risk.validate_signal(&sized, sized.price) {
            Ok(RiskCheck::Approved) => {}
            Ok(RiskCheck::Rejected(rejection)) => {
                tracing::warn!("Signal rejected by risk engine: {}", rejection);
                return None;
            }
            Err(e) => {
                tracing::error!("Invalid signal {}: {}", sized, e);
                return None;
            }
        }

        if sized.quantity == 0 {
            tracing::warn!("Order size for {} is zero; skipping", sized);
            return None;
        }

        let order = Order {
            symbol: sized.symbol.clone(),
            side,
            quantity: sized.quantity,
            order_type: self.options.order_type,
            price: sized.price,
        };

        match self.venue.place_order(&order).await {
            Ok(order_id) => {
                tracing::info!("Order placed: {} - {}", order_id, sized);
                Some(order_id)
            }
            Err(e) => {
                tracing::error!("Failed to execute signal {}: {}", sized, e);
                None
            }
        }
    }

    /// The signal with the quantity that will actually be ordered.
    ///
    /// Close signals trade the whole held position. Other signals without a
    /// quantity are sized by the risk engine.
    fn size_signal(&self, signal: &TradingSignal) -> Result<TradingSignal, RiskError> {
        let quantity = match signal.signal_type {
            SignalType::CloseLong | SignalType::CloseShort if signal.quantity == 0 => self
                .risk
                .get_position(&signal.symbol)
                .map(|p| p.quantity.abs())
                .unwrap_or(0),
            _ if signal.quantity > 0 => signal.quantity,
            _ => self
                .risk
                .calculate_position_size(&signal.symbol, signal.price, DEFAULT_RISK_PER_TRADE)?,
        };

        Ok(signal.clone().with_quantity(quantity))
    }

    pub fn log_status(&self) {
        let summary = self.risk.get_portfolio_summary();
        let limits = self.risk.limits();

        tracing::info!("==================== Status ====================");
        tracing::info!(
            "Positions: {}/{}",
            summary.total_positions,
            limits.max_positions
        );
        tracing::info!("Total Exposure: ${:.2}", summary.total_exposure);
        tracing::info!("Unrealized P&L: ${:.2}", summary.unrealized_pnl);
        tracing::info!("Daily P&L: ${:.2}", summary.daily_pnl);
        tracing::info!("Daily Trades: {}", summary.daily_trades);
        tracing::info!(
            "Realized on {}: ${:.2}",
            self.venue.name(),
            self.venue.realized_pnl()
        );

        let providers = self.manager.get_provider_status();
        for provider in &providers.providers {
            tracing::info!(
                "Provider {}: connected={}, failures={}",
                provider.name,
                provider.connected,
                provider.failures
            );
        }
        tracing::info!("Active provider: {}", providers.active_provider);

        for strategy in lock_strategies(&self.strategies).iter() {
            let perf = strategy.performance();
            tracing::info!(
                "{}: Trades={}, Win Rate={:.1}%, P&L=${:.2}",
                perf.strategy_name,
                perf.total_trades,
                perf.win_rate,
                perf.total_pnl
            );
        }

        match serde_json::to_string(&summary) {
            Ok(json) => tracing::debug!(portfolio = %json, "Portfolio snapshot"),
            Err(e) => tracing::debug!("Failed to serialize portfolio summary: {}", e),
        }
        tracing::info!("================================================");
    }

    /// Stop strategies, log final status and disconnect market data.
    pub async fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        tracing::info!("Shutting down bot...");

        for strategy in lock_strategies(&self.strategies).iter_mut() {
            strategy.stop();
        }

        self.log_status();
        self.manager.disconnect().await;

        if let Some(task) = self.event_task.take() {
            task.abort();
        }

        tracing::info!("Bot shutdown complete");
    }
}

/// Apply broker events to the risk engine and strategies until the venue
/// drops its sender.
async fn pump_events(
    mut events: UnboundedReceiver<BrokerEvent>,
    risk: Arc<RiskEngine>,
    strategies: SharedStrategies,
) {
    while let Some(event) = events.recv().await {
        apply_event(&risk, &strategies, event);
    }
    tracing::info!("Broker event channel closed");
}

fn apply_event(risk: &RiskEngine, strategies: &Mutex<Vec<Box<dyn Strategy>>>, event: BrokerEvent) {
    match event {
        BrokerEvent::Position {
            symbol,
            quantity,
            avg_price,
        } => {
            let current_price = risk
                .get_position(&symbol)
                .map(|p| p.current_price)
                .unwrap_or(avg_price);
            risk.update_position(&symbol, quantity, avg_price, current_price);
            for strategy in lock_strategies(strategies).iter_mut() {
                strategy.on_position_update(&symbol, quantity, avg_price);
            }
        }
        BrokerEvent::Fill {
            order_id,
            symbol,
            quantity,
            price,
            realized_pnl,
        } => {
            tracing::info!("Fill {}: {} {} @ ${:.2}", order_id, quantity, symbol, price);
            risk.record_trade();
            if !realized_pnl.is_zero() {
                risk.record_realized_pnl(realized_pnl);
            }
            for strategy in lock_strategies(strategies).iter_mut() {
                strategy.on_fill(&symbol, quantity, price);
            }
        }
        BrokerEvent::OrderStatus { order_id, status } => match status {
            OrderStatus::Submitted => tracing::debug!("Order {} submitted", order_id),
            OrderStatus::Filled => tracing::info!("Order {} filled", order_id),
        },
    }
}
