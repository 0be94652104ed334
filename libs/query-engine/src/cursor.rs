//! Cursor codec (C4, spec §4.4). Encodes `{position, fingerprint,
//! issuedAt}` as base64-URL(bincode(...)); fingerprints the query spec's
//! semantic parameters (excluding the cursor itself) with a truncated
//! blake3 hash, per §9 "Cursor fingerprinting".

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use telemetry_common::error::AppError;
use telemetry_models::cursor::{Cursor, CursorPosition};

pub const CURSOR_TTL: Duration = Duration::hours(1);

/// Canonicalise the semantic parameters that must match across pages, and
/// hash them. Implementers must exclude field order/whitespace/the cursor
/// itself — callers build this string deterministically (e.g. joining
/// sorted `key=value` pairs) before calling.
pub fn fingerprint(canonical_params: &str) -> [u8; 16] {
    let hash = blake3::hash(canonical_params.as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(&hash.as_bytes()[..16]);
    out
}

pub fn encode(position: CursorPosition, canonical_params: &str, issued_at: DateTime<Utc>) -> String {
    let cursor = Cursor {
        position,
        fingerprint: fingerprint(canonical_params),
        issued_at,
    };
    let bytes = bincode::serialize(&cursor).expect("cursor serialisation is infallible");
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode and validate a client-supplied cursor against the current
/// request's canonical parameters (spec §4.4 decode steps 1-5).
pub fn decode(token: &str, canonical_params: &str, now: DateTime<Utc>) -> Result<CursorPosition, AppError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| AppError::InvalidArgument("cursor is not valid base64".into()))?;

    let cursor: Cursor = bincode::deserialize(&bytes)
        .map_err(|_| AppError::InvalidArgument("cursor body is unparsable".into()))?;

    if cursor.issued_at.timestamp() == 0 {
        return Err(AppError::InvalidArgument("cursor has a zero issuedAt".into()));
    }

    let expected = fingerprint(canonical_params);
    if cursor.fingerprint != expected {
        return Err(AppError::InvalidArgument(
            "cursor is invalid: query parameters changed since it was issued".into(),
        ));
    }

    if now - cursor.issued_at > CURSOR_TTL {
        return Err(AppError::InvalidArgument(
            "cursor has expired; restart the query without a continue token".into(),
        ));
    }

    Ok(cursor.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit_position() -> CursorPosition {
        CursorPosition::TimestampTieBreak {
            timestamp: "2024-06-01T00:00:00Z".parse().unwrap(),
            tie_breaker: "audit-1".into(),
        }
    }

    #[test]
    fn round_trips_identical_spec() {
        let now = Utc::now();
        let token = encode(audit_position(), "start=a&end=b&filter=c&limit=100", now);
        let decoded = decode(&token, "start=a&end=b&filter=c&limit=100", now).unwrap();
        assert_eq!(decoded, audit_position());
    }

    #[test]
    fn changed_filter_invalidates_cursor() {
        let now = Utc::now();
        let token = encode(audit_position(), "start=a&end=b&filter=c&limit=100", now);
        let err = decode(&token, "start=a&end=b&filter=DIFFERENT&limit=100", now).unwrap_err();
        assert!(err.to_string().contains("parameters changed"));
    }

    #[test]
    fn expired_cursor_is_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        let token = encode(audit_position(), "p", issued);
        let err = decode(&token, "p", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn changing_continue_token_only_does_not_change_fingerprint() {
        // `continue` is excluded from the canonical params string by
        // construction — callers never include it when building the
        // fingerprint input.
        let fp_a = fingerprint("start=a&end=b&filter=c&limit=100");
        let fp_b = fingerprint("start=a&end=b&filter=c&limit=100");
        assert_eq!(fp_a, fp_b);
    }

    #[test]
    fn malformed_base64_is_rejected() {
        let err = decode("not valid base64!!", "p", Utc::now()).unwrap_err();
        assert!(err.to_string().contains("base64"));
    }
}
