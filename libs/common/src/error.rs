use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Stable error taxonomy for the telemetry API surface (see spec §7).
///
/// Every variant maps to one HTTP status and one machine-readable `reason`
/// string; handlers should construct the most specific variant rather than
/// falling back to `Internal`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    reason: &'static str,
    message: String,
}

impl AppError {
    /// The stable machine-readable reason string surfaced to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Database(e) => classify_db_error(e).reason(),
            AppError::Bus(_) => "Unavailable",
            AppError::InvalidArgument(_) => "InvalidArgument",
            AppError::NotFound(_) => "NotFound",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::ResourceExhausted(_) => "ResourceExhausted",
            AppError::Unavailable(_) => "Unavailable",
            AppError::Internal(_) => "Internal",
        }
    }
}

/// Classification of a raw store-driver error into the taxonomy buckets
/// named in spec §4.5: connection | timeout | syntax | memory | parameter | unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    Connection,
    Timeout,
    Syntax,
    Memory,
    Parameter,
    Unknown,
}

impl DbErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbErrorKind::Connection => "connection",
            DbErrorKind::Timeout => "timeout",
            DbErrorKind::Syntax => "syntax",
            DbErrorKind::Memory => "memory",
            DbErrorKind::Parameter => "parameter",
            DbErrorKind::Unknown => "unknown",
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            DbErrorKind::Connection | DbErrorKind::Timeout => "Unavailable",
            DbErrorKind::Memory => "ResourceExhausted",
            DbErrorKind::Syntax | DbErrorKind::Parameter => "InvalidArgument",
            DbErrorKind::Unknown => "Internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            DbErrorKind::Connection | DbErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            DbErrorKind::Memory => StatusCode::INSUFFICIENT_STORAGE,
            DbErrorKind::Syntax | DbErrorKind::Parameter => StatusCode::BAD_REQUEST,
            DbErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Classify a driver error by message substring, per spec §4.5.
pub fn classify_db_error(err: &sqlx::Error) -> DbErrorKind {
    if matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) {
        return DbErrorKind::Timeout;
    }
    if matches!(err, sqlx::Error::Io(_)) {
        return DbErrorKind::Connection;
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("timeout") || msg.contains("timed out") {
        DbErrorKind::Timeout
    } else if msg.contains("connection") || msg.contains("connect") {
        DbErrorKind::Connection
    } else if msg.contains("out of memory") || msg.contains("memory") {
        DbErrorKind::Memory
    } else if msg.contains("syntax") {
        DbErrorKind::Syntax
    } else if msg.contains("parameter") || msg.contains("bind") {
        DbErrorKind::Parameter
    } else {
        DbErrorKind::Unknown
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(e) => classify_db_error(e).status_code(),
            AppError::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::ResourceExhausted(_) => StatusCode::INSUFFICIENT_STORAGE,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            reason: self.reason(),
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_timeout_messages() {
        let err = sqlx::Error::PoolTimedOut;
        assert_eq!(classify_db_error(&err), DbErrorKind::Timeout);
    }

    #[test]
    fn invalid_argument_maps_to_bad_request() {
        let err = AppError::InvalidArgument("bad cursor".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.reason(), "InvalidArgument");
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::NotFound("event missing".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
