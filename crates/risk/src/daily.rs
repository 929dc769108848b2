//! Day-keyed realized P&L and trade counting.

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

/// Realized P&L and trade count for one trading date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub realized_pnl: Decimal,
    pub trades: u32,
}

impl DailyRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            realized_pnl: Decimal::ZERO,
            trades: 0,
        }
    }
}

/// The single active daily bucket.
///
/// Rollover is lazy: callers pass today's date before touching the bucket and
/// a new one starts when the date has moved.
#[derive(Debug)]
pub struct DailyBook {
    current: DailyRecord,
}

impl DailyBook {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            current: DailyRecord::new(today),
        }
    }

    /// Start a fresh bucket if `today` differs from the active date.
    ///
    /// Returns the finished record when a rollover happened.
    pub fn roll_to(&mut self, today: NaiveDate) -> Option<DailyRecord> {
        if today == self.current.date {
            return None;
        }

        info!("New trading day: {}", today);
        Some(std::mem::replace(
            &mut self.current,
            DailyRecord::new(today),
        ))
    }

    pub fn record_pnl(&mut self, pnl: Decimal) {
        self.current.realized_pnl += pnl;
    }

    pub fn record_trade(&mut self) {
        self.current.trades += 1;
    }

    pub fn current(&self) -> &DailyRecord {
        &self.current
    }
}
