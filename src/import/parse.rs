//! Lenient value parsing for exported CSV cells.
//!
//! Exports come from a spreadsheet round-trip, so cells are trimmed and
//! anything unparseable degrades to a default instead of failing the row.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

/// `true`, `1`, `yes` and `t` (any case) are true; everything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "t"
    )
}

/// Blank or malformed cells yield `None`.
pub fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Blank or malformed cells yield `None`.
pub fn parse_i32(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

/// Blank or malformed cells yield zero. Scientific notation is accepted.
pub fn parse_decimal(value: &str) -> Decimal {
    let value = value.trim();
    if value.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .unwrap_or(Decimal::ZERO)
}

/// Like `parse_decimal`, but drops thousands separators first (`1,234.5`).
pub fn parse_grouped_decimal(value: &str) -> Decimal {
    parse_decimal(&value.replace(',', ""))
}

/// Blank or malformed JSON yields `{}`.
pub fn parse_json(value: &str) -> Value {
    serde_json::from_str(value.trim()).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Trimmed text, `None` when blank.
pub fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse an exported timestamp.
///
/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS[.ffffff][ ][+HH[MM]]`. Values
/// without an offset are taken as UTC. Blank cells yield `None` silently;
/// anything else that does not parse is logged and yields `None`.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    tracing::warn!(value, "could not parse datetime");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn booleans_accept_common_truthy_spellings() {
        for v in ["true", "TRUE", "1", "yes", "t", " T "] {
            assert!(parse_bool(v), "{v:?}");
        }
        for v in ["", "false", "0", "no", "y", "on"] {
            assert!(!parse_bool(v), "{v:?}");
        }
    }

    #[test]
    fn ints_fall_back_to_none() {
        assert_eq!(parse_int(" 42 "), Some(42));
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("4.2"), None);
        assert_eq!(parse_i32("99999999999"), None);
    }

    #[test]
    fn decimals_fall_back_to_zero() {
        assert_eq!(parse_decimal("12.345600"), Decimal::new(12_345_600, 6));
        assert_eq!(parse_decimal("1e3"), Decimal::from(1000));
        assert_eq!(parse_decimal("n/a"), Decimal::ZERO);
        assert_eq!(parse_decimal(""), Decimal::ZERO);
        assert_eq!(parse_grouped_decimal("1,234.50"), Decimal::new(123_450, 2));
    }

    #[test]
    fn json_falls_back_to_empty_object() {
        assert_eq!(parse_json(r#"{"a": 1}"#)["a"], 1);
        assert_eq!(parse_json("{broken"), serde_json::json!({}));
        assert_eq!(parse_json(""), serde_json::json!({}));
    }

    #[test]
    fn datetimes_in_export_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();

        assert_eq!(parse_datetime("2024-03-05 10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05 10:30:00 +0000"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05 12:30:00+02"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05T11:30:00+01:00"), Some(expected));

        let with_fraction = parse_datetime("2024-03-05 10:30:00.250000").unwrap();
        assert_eq!(with_fraction.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn unparseable_datetimes_are_none() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("05/03/2024"), None);
    }
}
