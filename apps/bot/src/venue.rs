//! Order execution.
//!
//! The bot places orders through an [`ExecutionVenue`] and learns about
//! their outcome only through [`BrokerEvent`]s delivered on a channel, the way
//! a broker session reports fills and positions asynchronously.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tradeguard_risk::SignalType;

use crate::error::VenueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Side that executes a signal; `None` for signals that trade nothing.
    pub fn for_signal(signal_type: SignalType) -> Option<Self> {
        match signal_type {
            SignalType::Buy | SignalType::CloseShort => Some(Self::Buy),
            SignalType::Sell | SignalType::CloseLong => Some(Self::Sell),
            SignalType::Hold => None,
        }
    }

    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Limit,
    Market,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "LMT"),
            Self::Market => write!(f, "MKT"),
        }
    }
}

/// A day order for a stock.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub symbol: String,
    pub side: OrderSide,
    /// Always positive; direction comes from `side`
    pub quantity: i64,
    pub order_type: OrderType,
    /// Limit price for LMT orders, last seen price for MKT orders
    pub price: Decimal,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} @ ${:.2}",
            self.side, self.quantity, self.symbol, self.order_type, self.price
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Submitted,
    Filled,
}

/// Something the venue reports after the fact.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// An order executed. `quantity` is positive for buys, negative for sells.
    Fill {
        order_id: u64,
        symbol: String,
        quantity: i64,
        price: Decimal,
        /// P&L realized by the part of the fill that reduced a position
        realized_pnl: Decimal,
    },
    /// Current position for a symbol; zero quantity means flat.
    Position {
        symbol: String,
        quantity: i64,
        avg_price: Decimal,
    },
    OrderStatus {
        order_id: u64,
        status: OrderStatus,
    },
}

/// A held position as reported by the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct VenuePosition {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price: Decimal,
}

/// Where orders go.
#[async_trait]
pub trait ExecutionVenue: Send + Sync {
    fn name(&self) -> &str;

    /// Open positions, used to seed the risk ledger at startup.
    async fn positions(&self) -> Result<Vec<VenuePosition>, VenueError>;

    /// Submit an order and return its id. Fills arrive later as events.
    async fn place_order(&self, order: &Order) -> Result<u64, VenueError>;

    /// P&L realized by fills during this session.
    fn realized_pnl(&self) -> Decimal;
}

#[derive(Debug, Clone, Copy, Default)]
struct Holding {
    quantity: i64,
    avg_price: Decimal,
}

impl Holding {
    /// Apply a signed fill; returns the P&L it realized.
    fn apply(&mut self, quantity: i64, price: Decimal) -> Decimal {
        let same_direction = self.quantity == 0 || self.quantity.signum() == quantity.signum();

        if same_direction {
            let held = Decimal::from(self.quantity.unsigned_abs());
            let added = Decimal::from(quantity.unsigned_abs());
            self.avg_price = (held * self.avg_price + added * price) / (held + added);
            self.quantity += quantity;
            return Decimal::ZERO;
        }

        let closed = quantity.unsigned_abs().min(self.quantity.unsigned_abs());
        let realized =
            Decimal::from(closed) * (price - self.avg_price) * Decimal::from(self.quantity.signum());

        let flipped = quantity.unsigned_abs() > self.quantity.unsigned_abs();
        self.quantity += quantity;
        if self.quantity == 0 {
            self.avg_price = Decimal::ZERO;
        } else if flipped {
            self.avg_price = price;
        }

        realized
    }
}

/// In-memory venue that fills every order immediately at its price.
pub struct PaperVenue {
    events: UnboundedSender<BrokerEvent>,
    holdings: Mutex<HashMap<String, Holding>>,
    realized_pnl: Mutex<Decimal>,
    next_order_id: AtomicU64,
}

impl PaperVenue {
    /// Create a venue and the receiving end of its event channel.
    pub fn new() -> (Self, UnboundedReceiver<BrokerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sender(tx), rx)
    }

    pub fn with_sender(events: UnboundedSender<BrokerEvent>) -> Self {
        Self {
            events,
            holdings: Mutex::new(HashMap::new()),
            realized_pnl: Mutex::new(Decimal::ZERO),
            next_order_id: AtomicU64::new(1),
        }
    }

    fn lock_holdings(&self) -> MutexGuard<'_, HashMap<String, Holding>> {
        self.holdings.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Paper venue holdings mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn send(&self, event: BrokerEvent) {
        if self.events.send(event).is_err() {
            tracing::warn!("Broker event receiver dropped; event discarded");
        }
    }
}

#[async_trait]
impl ExecutionVenue for PaperVenue {
    fn name(&self) -> &str {
        "paper"
    }

    fn realized_pnl(&self) -> Decimal {
        *self
            .realized_pnl
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn positions(&self) -> Result<Vec<VenuePosition>, VenueError> {
        let mut positions: Vec<VenuePosition> = self
            .lock_holdings()
            .iter()
            .filter(|(_, h)| h.quantity != 0)
            .map(|(symbol, h)| VenuePosition {
                symbol: symbol.clone(),
                quantity: h.quantity,
                avg_price: h.avg_price,
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    async fn place_order(&self, order: &Order) -> Result<u64, VenueError> {
        if order.quantity <= 0 {
            return Err(VenueError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                order.quantity
            )));
        }
        if order.price <= Decimal::ZERO {
            return Err(VenueError::InvalidOrder(format!(
                "price must be positive, got {}",
                order.price
            )));
        }
        if self.events.is_closed() {
            return Err(VenueError::Unavailable(
                "nobody is listening for fills".to_string(),
            ));
        }

        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        let signed = order.quantity * order.side.sign();

        let (realized, holding) = {
            let mut holdings = self.lock_holdings();
            let holding = holdings.entry(order.symbol.clone()).or_default();
            let realized = holding.apply(signed, order.price);
            let snapshot = *holding;
            if snapshot.quantity == 0 {
                holdings.remove(&order.symbol);
            }
            (realized, snapshot)
        };

        if !realized.is_zero() {
            let mut total = self
                .realized_pnl
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *total += realized;
        }

        tracing::info!("[paper] Filled order {}: {}", order_id, order);

        self.send(BrokerEvent::OrderStatus {
            order_id,
            status: OrderStatus::Submitted,
        });
        self.send(BrokerEvent::Fill {
            order_id,
            symbol: order.symbol.clone(),
            quantity: signed,
            price: order.price,
            realized_pnl: realized,
        });
        self.send(BrokerEvent::Position {
            symbol: order.symbol.clone(),
            quantity: holding.quantity,
            avg_price: holding.avg_price,
        });
        self.send(BrokerEvent::OrderStatus {
            order_id,
            status: OrderStatus::Filled,
        });

        Ok(order_id)
    }
}
