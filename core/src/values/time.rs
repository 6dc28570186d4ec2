//! Text forms of durations and timestamps.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use super::ErrorValue;

/// Formats a duration as seconds with an optional fraction: `"1.5s"`, `"-3s"`.
pub fn format_duration(duration: TimeDelta) -> String {
    let seconds = duration.num_seconds();
    let nanos = duration.subsec_nanos();
    let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
    let seconds = seconds.unsigned_abs();
    let nanos = nanos.unsigned_abs();
    if nanos == 0 {
        return format!("{sign}{seconds}s");
    }
    let fraction = format!("{nanos:09}");
    format!("{sign}{seconds}.{}s", fraction.trim_end_matches('0'))
}

/// Parses a duration such as `"1h30m"`, `"-1.5s"` or `"250ms"`.
///
/// Supported units: `h`, `m`, `s`, `ms`, `us`, `ns`.
pub fn parse_duration(text: &str) -> Result<TimeDelta, ErrorValue> {
    let invalid = || ErrorValue::invalid_argument(format!("invalid duration: {text:?}"));
    let overflow = || ErrorValue::overflow("duration");

    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let unit_nanos: i128 = match unit {
            "h" => 3_600_000_000_000,
            "m" => 60_000_000_000,
            "s" => 1_000_000_000,
            "ms" => 1_000_000,
            "us" => 1_000,
            "ns" => 1,
            _ => return Err(invalid()),
        };

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        let whole: i128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        total_nanos = whole
            .checked_mul(unit_nanos)
            .and_then(|nanos| total_nanos.checked_add(nanos))
            .ok_or_else(overflow)?;

        let mut scale = unit_nanos;
        for digit in fraction.chars() {
            scale /= 10;
            let digit = digit.to_digit(10).ok_or_else(invalid)? as i128;
            total_nanos = total_nanos.checked_add(digit * scale).ok_or_else(overflow)?;
        }
        rest = tail;
    }

    if negative {
        total_nanos = -total_nanos;
    }
    i64::try_from(total_nanos)
        .map(TimeDelta::nanoseconds)
        .map_err(|_| overflow())
}

/// Formats a timestamp as RFC 3339 in UTC: `"2024-01-31T12:00:00Z"`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ErrorValue> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ErrorValue::invalid_argument(format!("invalid timestamp {text:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::seconds(3)), "3s");
        assert_eq!(format_duration(TimeDelta::milliseconds(1500)), "1.5s");
        assert_eq!(format_duration(TimeDelta::milliseconds(-1500)), "-1.5s");
        assert_eq!(format_duration(TimeDelta::nanoseconds(1)), "0.000000001s");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1h30m").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_duration("-1.5s").unwrap(), TimeDelta::milliseconds(-1500));
        assert_eq!(parse_duration("250ms").unwrap(), TimeDelta::milliseconds(250));
        assert_eq!(parse_duration("0").unwrap(), TimeDelta::zero());
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("3d").is_err());
        assert!(parse_duration("s").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        let err = parse_duration("99999999999999999999999999999999h").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Overflow);
        let err = parse_duration("9999999999999999999999999999999999999s").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Overflow);
        let err = parse_duration("-10000000000s").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Overflow);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = parse_timestamp("2024-01-31T12:00:00Z").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-31T12:00:00Z");
        let ts = parse_timestamp("2024-01-31T12:00:00.250+02:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-31T10:00:00.250Z");
    }
}
