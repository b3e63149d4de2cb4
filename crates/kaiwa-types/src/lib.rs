//! Shared data model for kaiwa.
//!
//! Plain serde types only: messages, structured feedback payloads, scenarios,
//! request shapes, and the transport error contract.

pub mod error;
pub mod feedback;
pub mod message;
pub mod request;
pub mod scenario;

pub use error::{ApiErrorBody, ErrorCode};
pub use feedback::{Correction, ScenarioFeedback, StructuredFeedback, VocabEntry};
pub use message::{Message, MessageId, Role};
pub use request::{PracticeRequest, RequestKind, ScenarioParams};
pub use scenario::{RoleNames, Scenario, ScenarioLine, Speaker};
