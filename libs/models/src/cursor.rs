use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record-type-specific pagination position (spec §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CursorPosition {
    /// Audit/activity: `(lastTimestamp, lastTieBreakerID)`.
    TimestampTieBreak {
        timestamp: DateTime<Utc>,
        tie_breaker: String,
    },
    /// Event: integer offset into the current query.
    Offset(u64),
}

/// Opaque pagination token: `{position, fingerprint, issuedAt}`, bound to
/// a 16-byte fingerprint of the query's semantic filtering parameters and
/// a one-hour TTL (spec §3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub position: CursorPosition,
    pub fingerprint: [u8; 16],
    pub issued_at: DateTime<Utc>,
}
