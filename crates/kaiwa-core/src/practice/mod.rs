//! Practice engine: stream accumulation, response parsing, turn advancement
//! and transcript composition for free and scenario modes.

pub mod accumulator;
pub mod context;
pub mod feedback;
pub mod history;
pub mod parser;
pub mod preview;
pub mod session;
pub mod turn;

pub use accumulator::StreamAccumulator;
pub use context::{ContextPolicy, ModelContext};
pub use feedback::{FeedbackProjection, FeedbackView, LatestFeedback};
pub use history::{Badges, DisplayEntry, DisplayHistory, InFlight, compose};
pub use parser::{COMPOSING_PLACEHOLDER, ParsedResponse, ReplyPayload, parse_response};
pub use preview::{LineStatus, PreviewLine, ScenarioPreview};
pub use session::{ModeKind, Notification, PracticeSession, SessionEffect, SessionEvent};
pub use turn::{SubmitError, TurnMachine, TurnOutcome, TurnPhase, TurnState, TurnTarget, Verdict};
