//! Shared ephemeral-resource validation (spec §4.9): time bounds,
//! `end > start`, window ceiling, and page-size clamping. Every "submit"
//! handler runs its spec through this before touching the store.

use chrono::{DateTime, Duration, Utc};
use telemetry_common::error::AppError;
use telemetry_models::query::TimeRange;
use telemetry_query_engine::time::parse_time;

pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 1000;

/// Resolve and validate a request's time bounds against a single `now`.
pub fn validate_time_range(
    time_range: &TimeRange,
    max_window_days: i64,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start = parse_time(&time_range.start, now)?;
    let end = parse_time(&time_range.end, now)?;

    if end <= start {
        return Err(AppError::InvalidArgument("end must be after start".into()));
    }

    let max_window = Duration::days(max_window_days);
    if end - start > max_window {
        return Err(AppError::InvalidArgument(format!(
            "time range exceeds the maximum window of {max_window_days} days"
        )));
    }

    Ok((start, end))
}

/// Clamp a requested page size into `[1, 1000]`, defaulting when absent.
pub fn validate_limit(requested: Option<u32>, default_page_size: u32, max_page_size: u32) -> Result<u32, AppError> {
    let limit = requested.unwrap_or(default_page_size);
    if limit < MIN_LIMIT || limit > max_page_size.min(MAX_LIMIT) {
        return Err(AppError::InvalidArgument(format!(
            "limit must be between {MIN_LIMIT} and {}",
            max_page_size.min(MAX_LIMIT)
        )));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_end_before_start() {
        let now = Utc::now();
        let range = TimeRange { start: "now".into(), end: "now-1h".into() };
        let err = validate_time_range(&range, 30, now).unwrap_err();
        assert!(err.to_string().contains("end must be after start"));
    }

    #[test]
    fn rejects_window_exceeding_maximum() {
        let now = Utc::now();
        let range = TimeRange { start: "now-40d".into(), end: "now".into() };
        let err = validate_time_range(&range, 30, now).unwrap_err();
        assert!(err.to_string().contains("maximum window"));
    }

    #[test]
    fn limit_defaults_when_absent() {
        assert_eq!(validate_limit(None, 100, 1000).unwrap(), 100);
    }

    #[test]
    fn limit_rejects_out_of_range() {
        assert!(validate_limit(Some(0), 100, 1000).is_err());
        assert!(validate_limit(Some(2000), 100, 1000).is_err());
    }
}
