//! Scenario tests for RiskEngine signal validation and daily accounting.
//!
//! # Contract Points
//!
//! 1. Directional checks run in a fixed order and stop at the first failure
//! 2. Limits are inclusive: a value equal to its limit passes
//! 3. Concentration counts the symbol's held value plus the new order
//! 4. Daily figures roll over lazily when the clock's date changes

#[cfg(test)]
mod tests {
    use crate::{
        ManualClock, RiskCheck, RiskEngine, RiskError, RiskLimits, RiskRejection, SignalType,
        TradingSignal, DEFAULT_RISK_PER_TRADE,
    };
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Arc;

    // =========================================================================
    // Helpers
    // =========================================================================

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap(),
        ))
    }

    fn engine_with(limits: RiskLimits) -> (RiskEngine, Arc<ManualClock>) {
        let clock = clock();
        let engine = RiskEngine::with_clock(limits, clock.clone()).unwrap();
        (engine, clock)
    }

    fn engine() -> (RiskEngine, Arc<ManualClock>) {
        engine_with(RiskLimits::default())
    }

    fn signal(symbol: &str, signal_type: SignalType, quantity: i64, price: Decimal) -> TradingSignal {
        TradingSignal::new(symbol, signal_type, price, Utc::now()).with_quantity(quantity)
    }

    fn buy(symbol: &str, quantity: i64, price: Decimal) -> TradingSignal {
        signal(symbol, SignalType::Buy, quantity, price)
    }

    fn rejection(check: RiskCheck) -> RiskRejection {
        match check {
            RiskCheck::Rejected(rejection) => rejection,
            RiskCheck::Approved => panic!("expected rejection, got approval"),
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_invalid_limits_rejected_at_construction() {
        let limits = RiskLimits {
            max_portfolio_exposure: dec!(0),
            ..RiskLimits::default()
        };
        let result = RiskEngine::with_clock(limits, clock());
        assert!(matches!(result, Err(RiskError::InvalidLimits(_))));
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    #[test]
    fn test_update_position_sequence_ending_at_zero_removes_symbol() {
        let (engine, _) = engine();

        engine.update_position("AAPL", 10, dec!(100), dec!(101));
        engine.update_position("AAPL", 20, dec!(100.5), dec!(102));
        assert_eq!(engine.get_position("AAPL").unwrap().quantity, 20);

        engine.update_position("AAPL", 0, dec!(0), dec!(102));
        assert!(engine.get_position("AAPL").is_none());
        assert!(engine.positions().is_empty());
    }

    #[test]
    fn test_update_prices_only_marks_held_symbols() {
        let (engine, _) = engine();
        engine.update_position("AAPL", 10, dec!(100), dec!(100));

        let prices = HashMap::from([
            ("AAPL".to_string(), dec!(110)),
            ("MSFT".to_string(), dec!(400)),
        ]);
        engine.update_prices(&prices);

        assert_eq!(engine.get_position("AAPL").unwrap().current_price, dec!(110));
        assert!(engine.get_position("MSFT").is_none());
        assert_eq!(engine.get_total_unrealized_pnl(), dec!(100));
        assert_eq!(engine.get_total_exposure(), dec!(1100));
    }

    // =========================================================================
    // Directional checks
    // =========================================================================

    #[test]
    fn test_order_value_at_limit_accepted() {
        let (engine, _) = engine();

        let check = engine.validate_signal(&buy("AAPL", 100, dec!(50)), dec!(50)).unwrap();
        assert!(check.is_approved());
        assert_eq!(check.reason(), "OK");
    }

    #[test]
    fn test_order_value_one_cent_over_limit_rejected() {
        let (engine, _) = engine();

        let check = engine
            .validate_signal(&buy("AAPL", 1, dec!(5000.01)), dec!(5000.01))
            .unwrap();

        let reason = check.reason();
        assert!(matches!(
            rejection(check),
            RiskRejection::OrderValueExceeded { .. }
        ));
        assert!(reason.contains("max_order_value"), "{}", reason);
    }

    #[test]
    fn test_validation_uses_current_price_not_signal_price() {
        let (engine, _) = engine();

        // signal says $40, market says $60
        let check = engine.validate_signal(&buy("AAPL", 100, dec!(40)), dec!(60)).unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::OrderValueExceeded { order_value, .. } if order_value == dec!(6000)
        ));
    }

    #[test]
    fn test_max_positions_blocks_only_new_symbols() {
        let (engine, _) = engine();
        for symbol in ["A", "B", "C", "D", "E"] {
            engine.update_position(symbol, 10, dec!(10), dec!(10));
        }

        let check = engine.validate_signal(&buy("F", 10, dec!(10)), dec!(10)).unwrap();
        assert_eq!(
            rejection(check),
            RiskRejection::MaxPositionsReached { limit: 5 }
        );

        let check = engine.validate_signal(&buy("A", 10, dec!(10)), dec!(10)).unwrap();
        assert!(check.is_approved());
    }

    #[test]
    fn test_position_size_limit() {
        let (engine, _) = engine_with(RiskLimits {
            max_position_size: dec!(1000),
            ..RiskLimits::default()
        });

        let check = engine.validate_signal(&buy("AAPL", 20, dec!(100)), dec!(100)).unwrap();
        let reason = check.reason();
        assert!(matches!(
            rejection(check),
            RiskRejection::PositionSizeExceeded { .. }
        ));
        assert!(reason.contains("max_position_size"));
    }

    #[test]
    fn test_portfolio_exposure_limit() {
        let (engine, _) = engine_with(RiskLimits {
            max_positions: 10,
            ..RiskLimits::default()
        });
        for symbol in ["A", "B", "C", "D"] {
            engine.update_position(symbol, 120, dec!(100), dec!(100));
        }
        // 48 000 held
        let check = engine.validate_signal(&buy("E", 30, dec!(100)), dec!(100)).unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::ExposureExceeded { projected, .. } if projected == dec!(51000)
        ));

        let check = engine.validate_signal(&buy("E", 20, dec!(100)), dec!(100)).unwrap();
        assert!(check.is_approved());
    }

    #[test]
    fn test_cumulative_symbol_concentration() {
        let (engine, _) = engine();

        // 4 000 / 50 000 = 8%
        let check = engine.validate_signal(&buy("X", 100, dec!(40)), dec!(40)).unwrap();
        assert!(check.is_approved());
        engine.update_position("X", 100, dec!(40), dec!(40));

        // (4 000 + 4 000) / 50 000 = 16%
        let check = engine.validate_signal(&buy("X", 100, dec!(40)), dec!(40)).unwrap();
        assert!(check.is_approved());
        engine.update_position("X", 200, dec!(40), dec!(40));

        // 24%
        let check = engine.validate_signal(&buy("X", 100, dec!(40)), dec!(40)).unwrap();
        assert!(check.is_approved());
        engine.update_position("X", 300, dec!(40), dec!(40));

        // (12 000 + 4 000) / 50 000 = 32%, past the 15 000 the limit allows
        let check = engine.validate_signal(&buy("X", 100, dec!(40)), dec!(40)).unwrap();
        let reason = check.reason();
        assert!(matches!(
            rejection(check),
            RiskRejection::ConcentrationExceeded { concentration, .. } if concentration == dec!(0.32)
        ));
        assert!(reason.contains("max_symbol_concentration"));

        // a different symbol is unaffected
        let check = engine.validate_signal(&buy("Y", 100, dec!(40)), dec!(40)).unwrap();
        assert!(check.is_approved());
    }

    #[test]
    fn test_daily_loss_includes_unrealized() {
        let (engine, _) = engine();
        engine.record_realized_pnl(dec!(-400));
        engine.update_position("Y", 10, dec!(100), dec!(85));

        // -400 realized + -150 unrealized
        let check = engine.validate_signal(&buy("Z", 10, dec!(10)), dec!(10)).unwrap();
        let reason = check.reason();
        assert!(matches!(
            rejection(check),
            RiskRejection::DailyLossLimit { total_pnl, .. } if total_pnl == dec!(-550)
        ));
        assert!(reason.contains("max_daily_loss"));
    }

    #[test]
    fn test_checks_short_circuit_in_order() {
        let (engine, _) = engine();
        engine.record_realized_pnl(dec!(-10000));

        // order value is checked before daily loss
        let check = engine.validate_signal(&buy("AAPL", 1000, dec!(10)), dec!(10)).unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::OrderValueExceeded { .. }
        ));
    }

    #[test]
    fn test_sell_is_validated_like_buy() {
        let (engine, _) = engine();

        let check = engine
            .validate_signal(&signal("AAPL", SignalType::Sell, 200, dec!(50)), dec!(50))
            .unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::OrderValueExceeded { .. }
        ));
    }

    #[test]
    fn test_sell_against_long_adds_to_symbol_exposure() {
        let (engine, _) = engine();
        engine.update_position("X", 120, dec!(100), dec!(100));

        // 12 000 held + 4 000 sold = 32% of 50 000
        let check = engine
            .validate_signal(&signal("X", SignalType::Sell, 40, dec!(100)), dec!(100))
            .unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::ConcentrationExceeded { .. }
        ));
    }

    #[test]
    fn test_order_value_overflow_is_error() {
        let (engine, _) = engine();

        let price = dec!(10000000000);
        let result = engine.validate_signal(&buy("X", i64::MAX, price), price);
        assert!(matches!(
            result,
            Err(RiskError::Overflow {
                operation: "order value",
                ..
            })
        ));
    }

    // =========================================================================
    // Non-directional checks
    // =========================================================================

    #[test]
    fn test_close_without_position_rejected() {
        let (engine, _) = engine();

        let check = engine
            .validate_signal(&signal("AAPL", SignalType::CloseLong, 0, dec!(100)), dec!(100))
            .unwrap();

        assert_eq!(check.reason(), "No open position to close for AAPL");
    }

    #[test]
    fn test_close_direction_must_match() {
        let (engine, _) = engine();
        engine.update_position("TSLA", -10, dec!(200), dec!(195));

        let check = engine
            .validate_signal(&signal("TSLA", SignalType::CloseLong, 0, dec!(195)), dec!(195))
            .unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::CannotCloseLong { .. }
        ));

        let check = engine
            .validate_signal(&signal("TSLA", SignalType::CloseShort, 0, dec!(195)), dec!(195))
            .unwrap();
        assert!(check.is_approved());

        engine.update_position("AAPL", 10, dec!(100), dec!(100));
        let check = engine
            .validate_signal(&signal("AAPL", SignalType::CloseShort, 0, dec!(100)), dec!(100))
            .unwrap();
        assert!(matches!(
            rejection(check),
            RiskRejection::CannotCloseShort { .. }
        ));
    }

    #[test]
    fn test_hold_always_passes() {
        let (engine, _) = engine();
        engine.record_realized_pnl(dec!(-10000));

        let check = engine
            .validate_signal(&signal("AAPL", SignalType::Hold, 0, dec!(100)), dec!(100))
            .unwrap();
        assert!(check.is_approved());
    }

    #[test]
    fn test_precondition_violations_are_errors() {
        let (engine, _) = engine();

        let result = engine.validate_signal(&buy("AAPL", 10, dec!(100)), dec!(0));
        assert!(matches!(result, Err(RiskError::InvalidPrice { .. })));

        let result = engine.validate_signal(&buy("AAPL", -10, dec!(100)), dec!(100));
        assert!(matches!(result, Err(RiskError::InvalidQuantity { quantity: -10, .. })));
    }

    // =========================================================================
    // Sizing
    // =========================================================================

    #[test]
    fn test_position_sizing() {
        let (engine, _) = engine();

        // min(10 000, 5 000) * 2% = 100 budget
        assert_eq!(
            engine
                .calculate_position_size("X", dec!(40), DEFAULT_RISK_PER_TRADE)
                .unwrap(),
            2
        );
        assert_eq!(
            engine
                .calculate_position_size("X", dec!(10), DEFAULT_RISK_PER_TRADE)
                .unwrap(),
            10
        );
        // budget buys nothing but one share fits the limit
        assert_eq!(
            engine
                .calculate_position_size("X", dec!(150), DEFAULT_RISK_PER_TRADE)
                .unwrap(),
            1
        );
        // one share does not fit the limit
        assert_eq!(
            engine
                .calculate_position_size("X", dec!(6000), DEFAULT_RISK_PER_TRADE)
                .unwrap(),
            0
        );
        assert_eq!(
            engine.calculate_position_size("X", dec!(40), dec!(0.1)).unwrap(),
            12
        );
    }

    #[test]
    fn test_position_sizing_rejects_non_positive_price() {
        let (engine, _) = engine();

        let result = engine.calculate_position_size("X", dec!(-1), DEFAULT_RISK_PER_TRADE);
        assert!(matches!(result, Err(RiskError::InvalidPrice { .. })));
    }

    #[test]
    fn test_position_sizing_overflow_is_error() {
        let (engine, _) = engine();

        let result = engine.calculate_position_size("X", Decimal::new(1, 28), DEFAULT_RISK_PER_TRADE);
        assert!(matches!(
            result,
            Err(RiskError::Overflow {
                operation: "position size",
                ..
            })
        ));
    }

    // =========================================================================
    // Daily accounting and emergency stop
    // =========================================================================

    #[test]
    fn test_emergency_stop_on_daily_loss() {
        let (engine, _) = engine();

        engine.record_realized_pnl(dec!(-500));
        assert!(!engine.check_emergency_stop());

        engine.record_realized_pnl(dec!(-0.01));
        assert!(engine.check_emergency_stop());
    }

    #[test]
    fn test_emergency_stop_on_exposure() {
        let (engine, _) = engine_with(RiskLimits {
            max_positions: 10,
            ..RiskLimits::default()
        });
        engine.update_position("A", 500, dec!(100), dec!(100));
        assert!(!engine.check_emergency_stop());

        engine.update_position("B", 1, dec!(1), dec!(1));
        assert!(engine.check_emergency_stop());
    }

    #[test]
    fn test_daily_rollover_forgets_yesterday() {
        let (engine, clock) = engine();

        engine.record_realized_pnl(dec!(-600));
        engine.record_trade();
        engine.record_trade();
        assert!(engine.check_emergency_stop());
        assert_eq!(engine.get_daily_trades(), 2);

        clock.advance(Duration::days(1));

        assert_eq!(engine.get_daily_pnl(), Decimal::ZERO);
        assert_eq!(engine.get_daily_trades(), 0);
        assert!(!engine.check_emergency_stop());

        let check = engine.validate_signal(&buy("AAPL", 10, dec!(100)), dec!(100)).unwrap();
        assert!(check.is_approved());
    }

    #[test]
    fn test_rollover_keeps_positions() {
        let (engine, clock) = engine();
        engine.update_position("AAPL", 10, dec!(100), dec!(90));

        clock.advance(Duration::days(1));

        assert_eq!(engine.get_total_unrealized_pnl(), dec!(-100));
        assert_eq!(engine.get_portfolio_summary().total_positions, 1);
    }

    // =========================================================================
    // Summary
    // =========================================================================

    #[test]
    fn test_portfolio_summary() {
        let (engine, _) = engine();
        engine.update_position("AAPL", 100, dec!(150), dec!(160));
        engine.update_position("TSLA", -10, dec!(200), dec!(210));
        engine.record_realized_pnl(dec!(-125));
        engine.record_trade();

        let summary = engine.get_portfolio_summary();

        assert_eq!(summary.total_positions, 2);
        assert_eq!(summary.total_exposure, dec!(18100));
        assert_eq!(summary.unrealized_pnl, dec!(900));
        assert_eq!(summary.daily_pnl, dec!(-125));
        assert_eq!(summary.daily_trades, 1);
        assert_eq!(summary.positions["AAPL"].market_value, dec!(16000));
        assert_eq!(summary.positions["TSLA"].unrealized_pnl, dec!(-100));

        let limits = &summary.limits;
        assert_eq!(limits.positions_used, 2);
        assert_eq!(limits.positions_ratio, dec!(0.4));
        assert_eq!(limits.exposure_used, dec!(18100));
        assert_eq!(limits.exposure_ratio, dec!(0.362));
        assert_eq!(limits.daily_loss_used, dec!(125));
        assert_eq!(limits.daily_loss_ratio, dec!(0.25));
    }

    #[test]
    fn test_summary_daily_loss_used_is_zero_on_winning_day() {
        let (engine, _) = engine();
        engine.record_realized_pnl(dec!(300));

        let summary = engine.get_portfolio_summary();
        assert_eq!(summary.limits.daily_loss_used, Decimal::ZERO);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let (engine, _) = engine();
        engine.update_position("AAPL", 1, dec!(100), dec!(100));

        let json = serde_json::to_value(engine.get_portfolio_summary()).unwrap();

        assert_eq!(json["totalPositions"], 1);
        assert!(json["positions"]["AAPL"]["unrealizedPnl"].is_number());
        assert!(json["limits"]["dailyLossUsed"].is_number());
    }
}
