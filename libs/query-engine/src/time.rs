//! Time parser (C1, spec §4.1). Accepts `now[-<N><unit>]` with units
//! `s,m,h,d,w`, and RFC3339 with a mandatory timezone. Callers compute
//! `now` once per request and thread it through every `parse_time` call
//! so relative bounds never drift against each other.

use chrono::{DateTime, Duration, Utc};
use telemetry_common::error::AppError;

pub fn parse_time(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::InvalidArgument(
            "time value must not be empty".into(),
        ));
    }

    if input == "now" {
        return Ok(now);
    }

    if let Some(offset) = input.strip_prefix("now-") {
        return parse_relative_offset(offset, now);
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            AppError::InvalidArgument(format!(
                "invalid time value {input:?}: expected \"now\", \"now-<N><unit>\" (units s,m,h,d,w), or RFC3339 with a timezone"
            ))
        })
}

fn parse_relative_offset(offset: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let invalid = || {
        AppError::InvalidArgument(format!(
            "invalid relative time \"now-{offset}\": expected <N><unit> with unit in s,m,h,d,w"
        ))
    };

    if offset.is_empty() {
        return Err(invalid());
    }

    let unit = offset.chars().last().ok_or_else(invalid)?;
    let digits = &offset[..offset.len() - unit.len_utf8()];
    let amount: i64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit {
        's' => Duration::seconds(amount),
        'm' => Duration::minutes(amount),
        'h' => Duration::hours(amount),
        'd' => Duration::days(amount),
        'w' => Duration::weeks(amount),
        _ => return Err(invalid()),
    };

    Ok(now - duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ref_now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn now_resolves_to_reference() {
        assert_eq!(parse_time("now", ref_now()).unwrap(), ref_now());
    }

    #[test]
    fn relative_units_subtract_correctly() {
        let now = ref_now();
        assert_eq!(parse_time("now-30s", now).unwrap(), now - Duration::seconds(30));
        assert_eq!(parse_time("now-5m", now).unwrap(), now - Duration::minutes(5));
        assert_eq!(parse_time("now-2h", now).unwrap(), now - Duration::hours(2));
        assert_eq!(parse_time("now-7d", now).unwrap(), now - Duration::days(7));
        assert_eq!(parse_time("now-1w", now).unwrap(), now - Duration::weeks(1));
    }

    #[test]
    fn seven_day_window_is_exactly_168_hours() {
        let now = ref_now();
        let start = parse_time("now-7d", now).unwrap();
        let end = parse_time("now", now).unwrap();
        assert_eq!(end - start, Duration::hours(7 * 24));
    }

    #[test]
    fn rfc3339_with_timezone_parses() {
        let parsed = parse_time("2024-01-01T00:00:00Z", ref_now()).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn malformed_strings_fail() {
        assert!(parse_time("yesterday", ref_now()).is_err());
        assert!(parse_time("now-7x", ref_now()).is_err());
        assert!(parse_time("now-d", ref_now()).is_err());
        assert!(parse_time("2024-01-01", ref_now()).is_err());
        assert!(parse_time("", ref_now()).is_err());
    }
}
