use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn generate_id() -> Uuid {
    Uuid::new_v4()
}

pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Synthesise a `resourceVersion` from an insertion instant: nanoseconds
/// since the epoch, monotonically increasing per row (spec §3).
pub fn resource_version_from(inserted_at: DateTime<Utc>) -> String {
    inserted_at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| inserted_at.timestamp() * 1_000_000_000)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn resource_version_is_nanosecond_string() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rv = resource_version_from(t);
        assert_eq!(rv, (t.timestamp_nanos_opt().unwrap()).to_string());
    }
}
