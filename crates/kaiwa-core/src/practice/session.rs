//! Practice session reducer.
//!
//! All session state changes go through `PracticeSession::update`. The
//! runtime feeds it events (user input, stream fragments, completion,
//! transport failure) and executes the returned effects.
//!
//! Completion and failure handlers only compute `SessionMutation`s; they are
//! applied after the handler returns so nothing re-enters history or context
//! from inside a completion.

use kaiwa_types::{
    ErrorCode, Message, MessageId, PracticeRequest, Role, Scenario, ScenarioFeedback,
    ScenarioParams, Speaker, StructuredFeedback,
};
use tracing::{debug, info, warn};

use super::accumulator::StreamAccumulator;
use super::context::{ContextPolicy, ModelContext};
use super::feedback::{FeedbackProjection, LatestFeedback};
use super::history::{DisplayEntry, DisplayHistory, InFlight, compose};
use super::parser::{COMPOSING_PLACEHOLDER, parse_response};
use super::preview::ScenarioPreview;
use super::turn::{SubmitError, TurnMachine, TurnOutcome, TurnState, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user submitted a line of input.
    Submit { text: String },
    /// A text fragment arrived for an in-flight response.
    Fragment { message_id: MessageId, text: String },
    /// The transport signalled the end of a response stream.
    StreamCompleted { message_id: MessageId },
    /// The request for a response failed before completing.
    TransportFailed { message_id: MessageId, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Rejected(SubmitError),
    TransportFailed { code: ErrorCode, message: String },
    /// A scenario reply finished without a readable verdict.
    UnparseableVerdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Start streaming `request`; fragments must be reported as `message_id`.
    SendRequest {
        message_id: MessageId,
        request: PracticeRequest,
    },
    Notify(Notification),
    /// A response was finalized. `outcome` is set for scenario turns.
    Finalized {
        message_id: MessageId,
        outcome: Option<TurnOutcome>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Free,
    Scenario,
}

#[derive(Debug, Clone)]
enum Mode {
    Free,
    Scenario { turns: TurnMachine, script: String },
}

/// Deferred state changes produced by completion handlers.
#[derive(Debug)]
enum SessionMutation {
    AppendHistory(Message),
    PushAssistantContext(Message),
    DiscardContext(Message),
    ClearContext,
    ClearPendingUser,
    EndStream,
}

/// One practice session: a mode plus its transcript, context and stream state.
///
/// Switching scenario, role or mode means building a new session.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    mode: Mode,
    context: ModelContext,
    history: DisplayHistory,
    pending_user: Option<Message>,
    in_flight: Option<StreamAccumulator>,
    feedback: FeedbackProjection,
}

impl PracticeSession {
    pub fn free() -> Self {
        Self::with_mode(Mode::Free, ContextPolicy::Accumulate)
    }

    pub fn scenario(scenario: Scenario, role: Speaker) -> Self {
        info!(scenario = %scenario.id, role = %role, "Starting scenario session");
        let script = scenario.script_text();
        Self::with_mode(
            Mode::Scenario {
                turns: TurnMachine::new(scenario, role),
                script,
            },
            ContextPolicy::ResetEachTurn,
        )
    }

    fn with_mode(mode: Mode, policy: ContextPolicy) -> Self {
        Self {
            mode,
            context: ModelContext::new(policy),
            history: DisplayHistory::new(),
            pending_user: None,
            in_flight: None,
            feedback: FeedbackProjection::new(),
        }
    }

    pub fn update(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        let (effects, mutations) = match event {
            SessionEvent::Submit { text } => (self.handle_submit(&text), Vec::new()),
            SessionEvent::Fragment { message_id, text } => {
                self.handle_fragment(&message_id, &text);
                (Vec::new(), Vec::new())
            }
            SessionEvent::StreamCompleted { message_id } => self.handle_completed(&message_id),
            SessionEvent::TransportFailed {
                message_id,
                message,
            } => self.handle_failed(&message_id, message),
        };
        self.apply_mutations(mutations);
        effects
    }

    fn handle_submit(&mut self, text: &str) -> Vec<SessionEffect> {
        match self.try_submit(text) {
            Ok(effect) => vec![effect],
            Err(err) => {
                debug!(%err, "Submission rejected");
                vec![SessionEffect::Notify(Notification::Rejected(err))]
            }
        }
    }

    fn try_submit(&mut self, text: &str) -> Result<SessionEffect, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let user = Message::user(text);
        let params = match &mut self.mode {
            Mode::Free => {
                if self.in_flight.is_some() {
                    return Err(SubmitError::StreamInFlight);
                }
                None
            }
            Mode::Scenario { turns, script } => {
                let target = turns.begin_turn(user.id.clone())?;
                Some(ScenarioParams {
                    current_line: Some(target.current_line),
                    user_role: Some(turns.role()),
                    scenario_context: Some(script.clone()),
                    partner_next_line: target.partner_next_line,
                })
            }
        };

        let messages = self.context.push_user(user.clone());
        let request = match params {
            Some(params) => PracticeRequest::scenario(messages, params),
            None => PracticeRequest::free(messages),
        };
        let response_id = MessageId::new();
        info!(
            response = %response_id,
            context_len = request.messages.len(),
            "Sending practice request"
        );

        self.pending_user = Some(user);
        self.in_flight = Some(StreamAccumulator::new(response_id.clone()));
        Ok(SessionEffect::SendRequest {
            message_id: response_id,
            request,
        })
    }

    fn handle_fragment(&mut self, message_id: &MessageId, text: &str) {
        let Some(acc) = self
            .in_flight
            .as_mut()
            .filter(|acc| acc.message_id() == message_id)
        else {
            debug!(id = %message_id, "Dropping fragment for unknown stream");
            return;
        };
        acc.push(text);

        let latest = match self.mode {
            Mode::Free => parse_response::<StructuredFeedback>(acc.buffer())
                .structured
                .map(LatestFeedback::Free),
            Mode::Scenario { .. } => parse_response::<ScenarioFeedback>(acc.buffer())
                .structured
                .map(LatestFeedback::Scenario),
        };
        if let Some(latest) = latest {
            self.feedback.observe(message_id, latest);
        }
    }

    fn handle_completed(
        &mut self,
        message_id: &MessageId,
    ) -> (Vec<SessionEffect>, Vec<SessionMutation>) {
        let Some(acc) = self
            .in_flight
            .as_mut()
            .filter(|acc| acc.message_id() == message_id && !acc.is_done())
        else {
            debug!(id = %message_id, "Ignoring completion for finished or unknown stream");
            return (Vec::new(), Vec::new());
        };
        acc.finish();
        let buffer = acc.buffer().to_string();
        let assistant = Message::with_id(message_id.clone(), Role::Assistant, buffer);

        let mut mutations = Vec::new();
        let outcome = match &mut self.mode {
            Mode::Free => {
                if let Some(user) = self.pending_user.clone() {
                    mutations.push(SessionMutation::AppendHistory(user));
                }
                mutations.push(SessionMutation::AppendHistory(assistant.clone()));
                mutations.push(SessionMutation::PushAssistantContext(assistant));
                None
            }
            Mode::Scenario { turns, .. } => {
                let Some(verdict) = parse_response::<ScenarioFeedback>(&assistant.text).structured
                else {
                    warn!(id = %message_id, "Scenario reply has no readable verdict");
                    return (
                        vec![SessionEffect::Notify(Notification::UnparseableVerdict)],
                        Vec::new(),
                    );
                };
                let Some(outcome) = turns.finalize(message_id, &verdict) else {
                    return (Vec::new(), vec![SessionMutation::EndStream]);
                };

                if let Some(user) = self.pending_user.clone() {
                    mutations.push(SessionMutation::AppendHistory(user));
                }
                match &outcome.verdict {
                    Verdict::Passed { partner_reply, .. } => {
                        if let Some(reply) = partner_reply {
                            let partner = turns.scenario().role_name(turns.role().other());
                            mutations.push(SessionMutation::AppendHistory(
                                Message::assistant(reply.clone()).labeled(partner),
                            ));
                        }
                    }
                    Verdict::Failed => mutations.push(SessionMutation::AppendHistory(assistant)),
                }
                mutations.push(SessionMutation::ClearContext);
                Some(outcome)
            }
        };
        mutations.push(SessionMutation::ClearPendingUser);
        mutations.push(SessionMutation::EndStream);

        let effects = vec![SessionEffect::Finalized {
            message_id: message_id.clone(),
            outcome,
        }];
        (effects, mutations)
    }

    fn handle_failed(
        &mut self,
        message_id: &MessageId,
        message: String,
    ) -> (Vec<SessionEffect>, Vec<SessionMutation>) {
        if self
            .in_flight
            .as_ref()
            .is_none_or(|acc| acc.message_id() != message_id)
        {
            debug!(id = %message_id, "Ignoring failure for unknown stream");
            return (Vec::new(), Vec::new());
        }

        let code = ErrorCode::classify(&message);
        warn!(id = %message_id, %code, error = %message, "Practice request failed");
        if let Mode::Scenario { turns, .. } = &mut self.mode {
            turns.abandon();
        }

        let mut mutations = Vec::new();
        if let Some(user) = self.pending_user.clone() {
            mutations.push(SessionMutation::DiscardContext(user));
        }
        mutations.push(SessionMutation::ClearPendingUser);
        mutations.push(SessionMutation::EndStream);
        (
            vec![SessionEffect::Notify(Notification::TransportFailed {
                code,
                message,
            })],
            mutations,
        )
    }

    fn apply_mutations(&mut self, mutations: Vec<SessionMutation>) {
        for mutation in mutations {
            match mutation {
                SessionMutation::AppendHistory(message) => self.history.append(message),
                SessionMutation::PushAssistantContext(message) => {
                    self.context.push_assistant(message);
                }
                SessionMutation::DiscardContext(message) => self.context.discard(&message),
                SessionMutation::ClearContext => {
                    debug!("Clearing model context after finalized turn");
                    self.context.clear();
                }
                SessionMutation::ClearPendingUser => self.pending_user = None,
                SessionMutation::EndStream => self.in_flight = None,
            }
        }
    }

    pub fn mode_kind(&self) -> ModeKind {
        match self.mode {
            Mode::Free => ModeKind::Free,
            Mode::Scenario { .. } => ModeKind::Scenario,
        }
    }

    pub fn turns(&self) -> Option<&TurnMachine> {
        match &self.mode {
            Mode::Free => None,
            Mode::Scenario { turns, .. } => Some(turns),
        }
    }

    pub fn turn_state(&self) -> Option<TurnState> {
        self.turns().map(TurnMachine::state)
    }

    pub fn progress(&self) -> Option<(usize, usize)> {
        self.turns().map(TurnMachine::progress)
    }

    /// Whether the input surface should refuse new submissions.
    pub fn is_input_disabled(&self) -> bool {
        self.in_flight.is_some() || self.turns().is_some_and(TurnMachine::is_completed)
    }

    pub fn preview(&self) -> Option<ScenarioPreview> {
        self.turns().map(|turns| {
            ScenarioPreview::build(
                turns.scenario(),
                turns.role(),
                turns.cursor(),
                turns.is_completed(),
            )
        })
    }

    pub fn history(&self) -> &DisplayHistory {
        &self.history
    }

    pub fn context(&self) -> &ModelContext {
        &self.context
    }

    pub fn feedback(&self) -> &FeedbackProjection {
        &self.feedback
    }

    pub fn pending_user(&self) -> Option<&Message> {
        self.pending_user.as_ref()
    }

    /// Display text of the in-flight response, recomputed from its buffer.
    pub fn streaming_text(&self) -> Option<String> {
        let acc = self.in_flight.as_ref()?;
        let text = match self.mode {
            Mode::Free => parse_response::<StructuredFeedback>(acc.buffer()).display_text,
            Mode::Scenario { .. } => parse_response::<ScenarioFeedback>(acc.buffer()).display_text,
        };
        (text != COMPOSING_PLACEHOLDER).then_some(text)
    }

    /// The composed transcript: history, pending submission, in-flight reply.
    pub fn display(&self) -> Vec<DisplayEntry> {
        let in_flight = self.in_flight.as_ref().map(|acc| InFlight {
            id: acc.message_id(),
            buffer: acc.buffer(),
        });
        match self.mode {
            Mode::Free => {
                compose::<StructuredFeedback>(&self.history, self.pending_user.as_ref(), in_flight)
            }
            Mode::Scenario { .. } => {
                compose::<ScenarioFeedback>(&self.history, self.pending_user.as_ref(), in_flight)
            }
        }
    }
}
