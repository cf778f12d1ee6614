use super::{ErrorCode, ErrorContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Severity levels, independent of [`ErrorCode`] — the same code can occur
/// at different severities depending on context (e.g. a single detector
/// timeout vs. a sustained run of them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Coarse grouping used by `ErrorMetrics` and `Health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Validation,
    Cache,
    Detector,
    Storage,
    Publish,
    System,
}

/// The engine's error type. Detector and storage errors are local —
/// they're constructed, logged/counted, and discarded; only [`ErrorCode::Fatal`]
/// ever propagates out of engine startup.
#[derive(Debug, ThisError, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
    pub context: ErrorContext,
    pub severity: ErrorSeverity,
    pub cause: Option<Box<Error>>,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Self::default_severity_for_code(code),
            code,
            message: message.into(),
            details: None,
            context: ErrorContext::new(),
            cause: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_cause(mut self, cause: Error) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn add_trace(mut self, trace: impl Into<String>) -> Self {
        self.context = self.context.add_trace(trace.into());
        self
    }

    pub fn category(&self) -> ErrorCategory {
        match self.code.category() {
            "validation" => ErrorCategory::Validation,
            "cache" => ErrorCategory::Cache,
            "detector" => ErrorCategory::Detector,
            "storage" => ErrorCategory::Storage,
            "publish" => ErrorCategory::Publish,
            _ => ErrorCategory::System,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn should_log_as_error(&self) -> bool {
        self.code.should_log_as_error() || matches!(self.severity, ErrorSeverity::High | ErrorSeverity::Critical)
    }

    fn default_severity_for_code(code: ErrorCode) -> ErrorSeverity {
        match code {
            ErrorCode::InvalidInput => ErrorSeverity::Low,
            ErrorCode::DetectorTransient => ErrorSeverity::Low,
            ErrorCode::CacheNotReady => ErrorSeverity::Medium,
            ErrorCode::PublishDropped => ErrorSeverity::Medium,
            ErrorCode::PersistFailure => ErrorSeverity::High,
            ErrorCode::Fatal => ErrorSeverity::Critical,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn cache_not_ready(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheNotReady, message)
    }

    pub fn detector_transient(detector: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DetectorTransient, message)
            .with_context(ErrorContext::new().with_detector(detector))
    }

    pub fn persist_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistFailure, message)
    }

    pub fn publish_dropped(topic: impl Into<String>) -> Self {
        Self::new(ErrorCode::PublishDropped, format!("queue full for topic {}", topic.into()))
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Fatal, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct ErrorSer<'a> {
            code: ErrorCode,
            message: &'a str,
            details: &'a Option<String>,
            context: &'a ErrorContext,
            severity: ErrorSeverity,
        }

        ErrorSer {
            code: self.code,
            message: &self.message,
            details: &self.details,
            context: &self.context,
            severity: self.severity,
        }
        .serialize(serializer)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::new(ErrorCode::Fatal, err.to_string()).add_trace("config::ConfigError conversion")
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::InvalidInput, err.to_string()).add_trace("serde_json::Error conversion")
    }
}

#[cfg(feature = "postgres-repository")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::new(ErrorCode::PersistFailure, err.to_string()).add_trace("sqlx::Error conversion")
    }
}

#[cfg(feature = "redis-bus")]
impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Self::new(ErrorCode::PublishDropped, err.to_string()).add_trace("redis::RedisError conversion")
    }
}
