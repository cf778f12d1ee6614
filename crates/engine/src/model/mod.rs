//! The engine's data model. All identifiers are opaque strings;
//! semantic typing lives in the field names and the enums below, not in
//! newtype wrappers — the engine never needs to distinguish, say, a
//! `client_ip` from a `session_id` at the type level, only at the value
//! level (see `EntityType`).

pub mod baseline;
pub mod block;
pub mod decision;
pub mod event;
pub mod features;
pub mod request;
pub mod rule;
pub mod severity;
pub mod signature;
pub mod threat;

pub use baseline::{BaselineProfile, EntityType, NumericStat};
pub use block::{ActiveBlock, BlockCategory};
pub use decision::{Decision, Verdict};
pub use event::{Event, EventType};
pub use features::{FeatureValue, Features};
pub use request::InspectionRequest;
pub use rule::{Operator, Rule};
pub use severity::Severity;
pub use signature::{MatchedSignature, Signature};
pub use threat::{Threat, ThreatStatus};
