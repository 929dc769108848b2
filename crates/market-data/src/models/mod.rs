//! Market data models
//!
//! - `quote` - Point-in-time quote with derived mid price and spread
//! - `bar` - OHLCV bar and the historical request parameters

mod bar;
mod quote;

pub use bar::{Bar, BarRequest};
pub use quote::Quote;
