//! Timestamp parsing and display.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::Value;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Integers below this are epoch seconds, anything larger epoch milliseconds.
const SECONDS_CUTOFF: i64 = 100_000_000_000;

/// Parse a record timestamp.
///
/// Accepts RFC 3339 strings and integer epoch seconds or milliseconds.
/// Anything else is treated as absent.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|t| {
            if (-SECONDS_CUTOFF..SECONDS_CUTOFF).contains(&t) {
                Utc.timestamp_opt(t, 0).single()
            } else {
                Utc.timestamp_millis_opt(t).single()
            }
        }),
        _ => None,
    }
}

/// Parse the first present candidate; null and empty values count as missing.
#[must_use]
pub fn first_timestamp<'a>(candidates: impl IntoIterator<Item = Option<&'a Value>>) -> Option<DateTime<Utc>> {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.is_null() && v.as_str() != Some(""))
        .and_then(parse_timestamp)
}

/// Format in local time as `YYYY-MM-DD HH:MM:SS`.
#[must_use]
pub fn format_local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rfc3339_and_millis() {
        let a = parse_timestamp(&json!("2025-01-02T03:04:05.000Z")).unwrap();
        let b = parse_timestamp(&json!(1_735_787_045_000_i64)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn small_integers_are_epoch_seconds() {
        let secs = parse_timestamp(&json!(1_735_787_045_i64)).unwrap();
        assert_eq!(secs, parse_timestamp(&json!("2025-01-02T03:04:05Z")).unwrap());
        assert_eq!(parse_timestamp(&json!(0)).unwrap().timestamp(), 0);
    }

    #[test]
    fn garbage_is_absent() {
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!({"t": 1})).is_none());
        assert!(parse_timestamp(&Value::Null).is_none());
    }

    #[test]
    fn first_timestamp_prefers_earlier_candidate() {
        let outer = json!("2025-01-01T00:00:00Z");
        let inner = json!("2025-06-01T00:00:00Z");
        let ts = first_timestamp([None, Some(&outer), Some(&inner)]).unwrap();
        assert_eq!(ts, parse_timestamp(&outer).unwrap());
    }

    #[test]
    fn local_format_shape() {
        let ts = parse_timestamp(&json!("2025-01-02T03:04:05Z")).unwrap();
        let s = format_local(&ts);
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[10..11], " ");
    }
}
