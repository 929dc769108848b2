//! US equity regular-session hours.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::America::New_York;

/// Whether `now` falls inside the US regular session (09:30-16:00 New York
/// time, Monday to Friday). Exchange holidays are not modelled.
pub fn is_us_market_open(now: DateTime<Utc>) -> bool {
    let local = now.with_timezone(&New_York);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN);
    let close = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN);
    let time = local.time();

    open <= time && time <= close
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_open_mid_session() {
        // Wednesday 10:00 EST
        let now = Utc.with_ymd_and_hms(2024, 1, 17, 15, 0, 0).unwrap();
        assert!(is_us_market_open(now));
    }

    #[test]
    fn test_session_bounds_are_inclusive() {
        // 09:30 EST
        let open = Utc.with_ymd_and_hms(2024, 1, 17, 14, 30, 0).unwrap();
        assert!(is_us_market_open(open));
        // 16:00 EST
        let close = Utc.with_ymd_and_hms(2024, 1, 17, 21, 0, 0).unwrap();
        assert!(is_us_market_open(close));
        // 16:30 EST
        let after = Utc.with_ymd_and_hms(2024, 1, 17, 21, 30, 0).unwrap();
        assert!(!is_us_market_open(after));
    }

    #[test]
    fn test_daylight_saving_offset() {
        // 09:45 EDT is 13:45 UTC in July
        let now = Utc.with_ymd_and_hms(2024, 7, 10, 13, 45, 0).unwrap();
        assert!(is_us_market_open(now));
        // 09:00 EDT
        let early = Utc.with_ymd_and_hms(2024, 7, 10, 13, 0, 0).unwrap();
        assert!(!is_us_market_open(early));
    }

    #[test]
    fn test_closed_on_weekend() {
        // Saturday noon EST
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 17, 0, 0).unwrap();
        assert!(!is_us_market_open(now));
    }
}
