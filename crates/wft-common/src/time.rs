//! ---
//! wft_section: "01-core-functionality"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Shared primitives and utilities for the twin workspace."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use chrono::{DateTime, TimeZone, Utc};

/// Rendering used for hour bucket keys and the `hour` partition column.
pub const HOUR_KEY_FORMAT: &str = "%Y-%m-%dT%H:00:00Z";

/// Rendering used for the `date` partition column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const SECONDS_PER_HOUR: i64 = 3600;

/// Drop sub-millisecond precision, matching the persisted `timestamp(ms)` type.
pub fn floor_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.timestamp_millis())
        .single()
        .unwrap_or(ts)
}

/// Truncate a timestamp to the start of its UTC hour.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let hour_start = ts.timestamp().div_euclid(SECONDS_PER_HOUR) * SECONDS_PER_HOUR;
    Utc.timestamp_opt(hour_start, 0).single().unwrap_or(ts)
}

/// ISO-8601 hour string, e.g. `2026-01-05T03:00:00Z`.
pub fn hour_key(ts: DateTime<Utc>) -> String {
    floor_to_hour(ts).format(HOUR_KEY_FORMAT).to_string()
}

/// Calendar date string, e.g. `2026-01-05`.
pub fn date_key(ts: DateTime<Utc>) -> String {
    ts.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn hour_key_truncates_minutes_and_seconds() {
        assert_eq!(hour_key(ts("2026-01-05T03:59:59.999Z")), "2026-01-05T03:00:00Z");
        assert_eq!(hour_key(ts("2026-01-05T04:00:00Z")), "2026-01-05T04:00:00Z");
    }

    #[test]
    fn floor_to_millis_drops_micros() {
        let raw = ts("2026-01-05T00:00:00.123456Z");
        assert_eq!(floor_to_millis(raw), ts("2026-01-05T00:00:00.123Z"));
    }

    #[test]
    fn date_key_uses_utc_calendar_day() {
        assert_eq!(date_key(ts("2026-01-05T23:30:00Z")), "2026-01-05");
    }
}
