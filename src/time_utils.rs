// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Wall-clock format used for local timestamps in the cache.
const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp with any offset into UTC.
pub fn parse_utc_rfc3339(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

pub fn format_local(date: NaiveDateTime) -> String {
    date.format(LOCAL_FORMAT).to_string()
}

pub fn parse_local(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, LOCAL_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_offset_timestamp_normalizes_to_utc() {
        let parsed = parse_utc_rfc3339("2024-06-01T09:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap());
        assert_eq!(format_utc_rfc3339(parsed), "2024-06-01T07:30:00Z");
    }

    #[test]
    fn test_local_format() {
        let local = parse_local("2024-06-01T09:30:15").unwrap();
        assert_eq!(format_local(local), "2024-06-01T09:30:15");
        assert!(parse_local("2024-06-01 09:30").is_err());
    }
}
