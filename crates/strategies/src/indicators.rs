//! Price-series indicators shared by the strategies.
//!
//! All functions read the most recent values from the end of `prices` and
//! return `None` when there is not enough history.

use rust_decimal::Decimal;

/// Simple moving average of the last `period` prices.
pub fn sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let sum: Decimal = window.iter().copied().sum();
    Some(sum / Decimal::from(period))
}

/// Rate of change over `period` prices, in percent.
///
/// `(now - then) / then * 100`; undefined when the base price is zero.
pub fn roc(prices: &[Decimal], period: usize) -> Option<Decimal> {
    let (now, then) = endpoints(prices, period)?;
    if then.is_zero() {
        return None;
    }
    Some((now - then) / then * Decimal::ONE_HUNDRED)
}

/// Absolute price change over `period` prices.
pub fn momentum(prices: &[Decimal], period: usize) -> Option<Decimal> {
    let (now, then) = endpoints(prices, period)?;
    Some(now - then)
}

fn endpoints(prices: &[Decimal], period: usize) -> Option<(Decimal, Decimal)> {
    if prices.len() < period + 1 {
        return None;
    }
    let now = prices[prices.len() - 1];
    let then = prices[prices.len() - 1 - period];
    Some((now, then))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sma() {
        let prices = [dec!(1), dec!(2), dec!(3), dec!(4)];
        assert_eq!(sma(&prices, 2), Some(dec!(3.5)));
        assert_eq!(sma(&prices, 4), Some(dec!(2.5)));
        assert_eq!(sma(&prices, 5), None);
        assert_eq!(sma(&prices, 0), None);
    }

    #[test]
    fn test_roc() {
        let prices = [dec!(100), dec!(101), dec!(103)];
        assert_eq!(roc(&prices, 2), Some(dec!(3)));
        assert_eq!(roc(&prices, 3), None);
        assert_eq!(roc(&[dec!(50), dec!(49)], 1), Some(dec!(-2)));
    }

    #[test]
    fn test_roc_zero_base() {
        let prices = [dec!(0), dec!(5)];
        assert_eq!(roc(&prices, 1), None);
        assert_eq!(momentum(&prices, 1), Some(dec!(5)));
    }
}
