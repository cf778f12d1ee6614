//! Error taxonomy for the inspection engine.
//!
//! Six kinds only, matching the error handling design: `InvalidInput`,
//! `CacheNotReady`, `DetectorTransient`, `PersistFailure`, `PublishDropped`,
//! `Fatal`. Detector and storage errors never bubble out of the hot path —
//! they are recorded locally (see [`ErrorMetrics`]) and the arbiter treats a
//! failed detector as "no finding".

pub mod codes;
pub mod context;
pub mod framework;
pub mod metrics;

pub use codes::ErrorCode;
pub use context::ErrorContext;
pub use framework::{Error, ErrorCategory, ErrorSeverity, Result};
pub use metrics::ErrorMetrics;
