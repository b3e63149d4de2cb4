//! Human-facing transcript and the compositor that renders it.

use kaiwa_types::{Message, MessageId, Role};

use super::parser::{ReplyPayload, parse_response};

/// Append-only transcript of finalized messages.
///
/// Independent from the model-facing context, which may be cleared at any time.
#[derive(Debug, Clone, Default)]
pub struct DisplayHistory {
    messages: Vec<Message>,
}

impl DisplayHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Feedback indicators shown under an assistant entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Badges {
    pub corrections: bool,
    pub vocabulary: bool,
}

impl Badges {
    fn of<T: ReplyPayload>(payload: &T) -> Self {
        Self {
            corrections: !payload.corrections().is_empty(),
            vocabulary: !payload.new_vocabulary().is_empty(),
        }
    }
}

/// One rendered transcript row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry {
    pub id: MessageId,
    pub role: Role,
    pub label: Option<String>,
    pub text: String,
    pub streaming: bool,
    pub badges: Badges,
}

/// The assistant message currently streaming.
#[derive(Debug, Clone, Copy)]
pub struct InFlight<'a> {
    pub id: &'a MessageId,
    pub buffer: &'a str,
}

/// Builds the transcript shown to the user.
///
/// Finalized history comes first, then the submitted-but-unjudged user
/// message, then the in-flight reply unless it already parses as a passing
/// verdict (that content is folded into history on finalization).
pub fn compose<T: ReplyPayload>(
    history: &DisplayHistory,
    pending_user: Option<&Message>,
    in_flight: Option<InFlight<'_>>,
) -> Vec<DisplayEntry> {
    let mut entries: Vec<DisplayEntry> = history.messages().iter().map(entry_for::<T>).collect();

    if let Some(user) = pending_user {
        entries.push(entry_for::<T>(user));
    }

    if let Some(in_flight) = in_flight {
        let parsed = parse_response::<T>(in_flight.buffer);
        let passed = parsed.structured.as_ref().is_some_and(ReplyPayload::is_pass);
        if !passed {
            entries.push(DisplayEntry {
                id: in_flight.id.clone(),
                role: Role::Assistant,
                label: None,
                badges: parsed.structured.as_ref().map(Badges::of).unwrap_or_default(),
                text: parsed.display_text,
                streaming: true,
            });
        }
    }

    entries
}

fn entry_for<T: ReplyPayload>(message: &Message) -> DisplayEntry {
    // User input and synthesized partner lines are plain text.
    if message.is_user() || message.label.is_some() {
        return DisplayEntry {
            id: message.id.clone(),
            role: message.role,
            label: message.label.clone(),
            text: message.text.clone(),
            streaming: false,
            badges: Badges::default(),
        };
    }

    let parsed = parse_response::<T>(&message.text);
    DisplayEntry {
        id: message.id.clone(),
        role: message.role,
        label: None,
        badges: parsed.structured.as_ref().map(Badges::of).unwrap_or_default(),
        text: parsed.display_text,
        streaming: false,
    }
}
