//! Business-timezone time utilities
//!
//! Calendar days are evaluated in the configured business timezone; the
//! repository layer only sees `i64` Unix millis and `YYYY-MM-DD` keys.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::error::{DeliveryError, DeliveryResult};

/// Parse a date string (YYYY-MM-DD)
pub fn parse_date(date: &str) -> DeliveryResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| DeliveryError::InvalidArgument(format!("Invalid date format: {}", date)))
}

/// Stored day key (YYYY-MM-DD)
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Date + wall-clock time → Unix millis (business timezone)
///
/// DST gap fallback: if the local time does not exist, fall back to UTC.
pub fn date_time_to_millis(date: NaiveDate, time: NaiveTime, tz: Tz) -> i64 {
    let naive = date.and_time(time);
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// Day start (00:00) → Unix millis (business timezone)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_time_to_millis(date, NaiveTime::MIN, tz)
}

/// Day end → next day's 00:00 in Unix millis (business timezone)
///
/// Callers use `< end` (exclusive).
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    date_time_to_millis(next_day, NaiveTime::MIN, tz)
}

/// `[start, end)` millis of a business day
pub fn day_range_millis(date: NaiveDate, tz: Tz) -> (i64, i64) {
    (day_start_millis(date, tz), day_end_millis(date, tz))
}

/// Today in the business timezone
pub fn today(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

/// Delivery instant for a shipment generated now for `date`.
///
/// Now when `date` is today; otherwise the day's start, so the instant
/// always falls inside `[start, end)`.
pub fn delivery_instant(date: NaiveDate, now_millis: i64, tz: Tz) -> i64 {
    let (start, end) = day_range_millis(date, tz);
    if (start..end).contains(&now_millis) {
        now_millis
    } else {
        start
    }
}

/// Parse an HH:MM time, falling back to `default` with a warning
pub fn parse_hhmm(value: &str, default: NaiveTime) -> NaiveTime {
    NaiveTime::parse_from_str(value, "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse time '{}': {}, falling back to {}",
            value,
            e,
            default.format("%H:%M")
        );
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-15").unwrap(), date(2024, 3, 15));
        assert!(matches!(
            parse_date("15/03/2024"),
            Err(DeliveryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_day_range_utc() {
        let (start, end) = day_range_millis(date(2024, 1, 1), chrono_tz::UTC);
        assert_eq!(start, 1_704_067_200_000);
        assert_eq!(end - start, 86_400_000);
    }

    #[test]
    fn test_day_range_spans_dst_change() {
        // Europe/Madrid springs forward on 2024-03-31: a 23 hour day
        let (start, end) = day_range_millis(date(2024, 3, 31), chrono_tz::Europe::Madrid);
        assert_eq!(end - start, 23 * 3_600_000);
    }

    #[test]
    fn test_delivery_instant_is_inside_day() {
        let tz = chrono_tz::Europe::Madrid;
        let day = date(2024, 5, 10);
        let (start, end) = day_range_millis(day, tz);

        let noon = start + 12 * 3_600_000;
        assert_eq!(delivery_instant(day, noon, tz), noon);
        // generating for a past day pins to its start
        assert_eq!(delivery_instant(day, end + 5, tz), start);
    }

    #[test]
    fn test_parse_hhmm_fallback() {
        let five = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        assert_eq!(
            parse_hhmm("06:30", five),
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
        assert_eq!(parse_hhmm("25:99", five), five);
    }
}
