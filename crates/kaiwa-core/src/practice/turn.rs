//! Scenario turn state machine.
//!
//! Owns the line cursor for one (scenario, role) pair. Turns advance only on
//! a fully parsed verdict delivered at stream completion, and each finalized
//! response id is consumed at most once.

use std::fmt;

use kaiwa_types::{MessageId, Scenario, ScenarioFeedback, ScenarioLine, Speaker};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingUserInput {
        cursor: usize,
    },
    AwaitingVerdict {
        cursor: usize,
        /// The user submission being judged.
        pending: MessageId,
    },
    Completed,
}

/// Snapshot of the machine for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnState {
    pub user_line_cursor: usize,
    pub awaiting_verdict: bool,
    pub completed: bool,
    pub last_finalized_message_id: Option<MessageId>,
}

/// Why a submission was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// Empty or whitespace-only input.
    EmptyInput,
    /// A scenario verdict for the previous submission has not arrived yet.
    VerdictPending,
    /// A free-mode reply is still streaming.
    StreamInFlight,
    /// The scenario is finished; input is disabled.
    Completed,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::EmptyInput => write!(f, "Nothing to send"),
            SubmitError::VerdictPending => write!(f, "Still waiting for the verdict"),
            SubmitError::StreamInFlight => write!(f, "Still waiting for the reply"),
            SubmitError::Completed => write!(f, "Scenario completed, input is disabled"),
        }
    }
}

impl std::error::Error for SubmitError {}

/// The line a submission is judged against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTarget {
    pub cursor: usize,
    /// Original index of the line in the script.
    pub line_index: usize,
    pub current_line: String,
    pub partner_next_line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed {
        /// Partner line to fold into history, when the model produced one.
        partner_reply: Option<String>,
        completed: bool,
    },
    Failed,
}

/// A consumed verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub user_message_id: MessageId,
    /// Cursor of the line that was judged.
    pub cursor: usize,
    pub verdict: Verdict,
}

#[derive(Debug, Clone)]
pub struct TurnMachine {
    scenario: Scenario,
    role: Speaker,
    total: usize,
    phase: TurnPhase,
    last_finalized: Option<MessageId>,
}

impl TurnMachine {
    pub fn new(scenario: Scenario, role: Speaker) -> Self {
        let total = scenario.total_user_lines(role);
        let phase = if total == 0 {
            TurnPhase::Completed
        } else {
            TurnPhase::AwaitingUserInput { cursor: 0 }
        };
        Self {
            scenario,
            role,
            total,
            phase,
            last_finalized: None,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn role(&self) -> Speaker {
        self.role
    }

    pub fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    pub fn total_user_lines(&self) -> usize {
        self.total
    }

    pub fn cursor(&self) -> usize {
        match self.phase {
            TurnPhase::AwaitingUserInput { cursor } | TurnPhase::AwaitingVerdict { cursor, .. } => {
                cursor
            }
            TurnPhase::Completed => self.total,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase == TurnPhase::Completed
    }

    pub fn is_awaiting_verdict(&self) -> bool {
        matches!(self.phase, TurnPhase::AwaitingVerdict { .. })
    }

    pub fn state(&self) -> TurnState {
        TurnState {
            user_line_cursor: self.cursor(),
            awaiting_verdict: self.is_awaiting_verdict(),
            completed: self.is_completed(),
            last_finalized_message_id: self.last_finalized.clone(),
        }
    }

    /// `(cursor + 1, total)` while practicing, frozen at `(total, total)` once completed.
    pub fn progress(&self) -> (usize, usize) {
        if self.is_completed() {
            (self.total, self.total)
        } else {
            (self.cursor() + 1, self.total)
        }
    }

    /// The line the user is expected to translate next.
    pub fn current_line(&self) -> Option<(usize, &ScenarioLine)> {
        if self.is_completed() {
            return None;
        }
        self.scenario.user_line(self.role, self.cursor())
    }

    /// Accepts a submission for the current line.
    pub fn begin_turn(&mut self, user_message_id: MessageId) -> Result<TurnTarget, SubmitError> {
        let cursor = match self.phase {
            TurnPhase::AwaitingUserInput { cursor } => cursor,
            TurnPhase::AwaitingVerdict { .. } => return Err(SubmitError::VerdictPending),
            TurnPhase::Completed => return Err(SubmitError::Completed),
        };
        let Some((line_index, line)) = self.scenario.user_line(self.role, cursor) else {
            return Err(SubmitError::Completed);
        };
        let target = TurnTarget {
            cursor,
            line_index,
            current_line: line.text.clone(),
            partner_next_line: self
                .scenario
                .partner_next_line(self.role, cursor)
                .map(|line| line.text.clone()),
        };

        debug!(cursor, line_index, "Awaiting verdict");
        self.phase = TurnPhase::AwaitingVerdict {
            cursor,
            pending: user_message_id,
        };
        Ok(target)
    }

    /// Consumes the verdict carried by finalized response `response_id`.
    ///
    /// Returns `None` when there is no pending turn or `response_id` was
    /// already consumed.
    pub fn finalize(
        &mut self,
        response_id: &MessageId,
        feedback: &ScenarioFeedback,
    ) -> Option<TurnOutcome> {
        if self.last_finalized.as_ref() == Some(response_id) {
            debug!(id = %response_id, "Ignoring duplicate completion");
            return None;
        }
        let TurnPhase::AwaitingVerdict { cursor, pending } = &self.phase else {
            debug!(id = %response_id, "No pending turn for completion");
            return None;
        };
        let cursor = *cursor;
        let user_message_id = pending.clone();
        self.last_finalized = Some(response_id.clone());

        let verdict = if feedback.passed {
            let next = cursor + 1;
            let completed = next >= self.total;
            self.phase = if completed {
                TurnPhase::Completed
            } else {
                TurnPhase::AwaitingUserInput { cursor: next }
            };
            let partner_reply = Some(feedback.partner_reply.trim())
                .filter(|reply| !reply.is_empty())
                .map(str::to_string);
            info!(cursor, completed, "Line passed");
            Verdict::Passed {
                partner_reply,
                completed,
            }
        } else {
            self.phase = TurnPhase::AwaitingUserInput { cursor };
            info!(cursor, "Line failed, retrying");
            Verdict::Failed
        };

        Some(TurnOutcome {
            user_message_id,
            cursor,
            verdict,
        })
    }

    /// Releases a pending turn whose request failed. Nothing is consumed.
    pub fn abandon(&mut self) -> Option<MessageId> {
        let TurnPhase::AwaitingVerdict { cursor, pending } = &self.phase else {
            return None;
        };
        let pending = pending.clone();
        self.phase = TurnPhase::AwaitingUserInput { cursor: *cursor };
        Some(pending)
    }
}
