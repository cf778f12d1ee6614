use serde::{Deserialize, Serialize};
use std::fmt;

/// The six error kinds of the engine's error handling design.
///
/// These are kinds, not detailed HTTP-style codes — the engine has no HTTP
/// surface of its own, callers map these onto whatever transport they use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed `InspectionRequest` or oversized body. Surfaced to the
    /// caller; not logged at error level.
    InvalidInput,
    /// The baseline/rule cache has no snapshot yet. Behavior on the hot
    /// path follows `engine.fail_open`.
    CacheNotReady,
    /// A single detector errored (bad data, repository timeout, deadline
    /// overrun). Treated as "no finding"; counted for `Health`.
    DetectorTransient,
    /// A durable write (threat or active-block change) failed after
    /// retries. The in-memory decision stands.
    PersistFailure,
    /// The event publisher's bounded queue was full; the event was
    /// dropped rather than blocking the hot path.
    PublishDropped,
    /// Cache reload failed at startup, or a required dependency is
    /// unreachable during the startup grace period. Only this kind can
    /// fail the process.
    Fatal,
}

impl ErrorCode {
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "validation",
            ErrorCode::CacheNotReady => "cache",
            ErrorCode::DetectorTransient => "detector",
            ErrorCode::PersistFailure => "storage",
            ErrorCode::PublishDropped => "publish",
            ErrorCode::Fatal => "system",
        }
    }

    /// Whether the underlying operation is safe to retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::CacheNotReady | ErrorCode::DetectorTransient | ErrorCode::PersistFailure
        )
    }

    /// `InvalidInput` is not logged at error level; everything
    /// else is observable.
    pub fn should_log_as_error(&self) -> bool {
        !matches!(self, ErrorCode::InvalidInput)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
