//! Model-facing conversation context.
//!
//! This is the message list actually transmitted upstream, kept apart from
//! the human-facing transcript in [`super::history`].

use kaiwa_types::Message;
use tracing::debug;

/// How the model-facing list evolves across turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    /// Keep the whole conversation (free mode).
    Accumulate,
    /// Every request carries only the newest user message (scenario mode).
    ResetEachTurn,
}

#[derive(Debug, Clone)]
pub struct ModelContext {
    policy: ContextPolicy,
    messages: Vec<Message>,
}

impl ModelContext {
    pub fn new(policy: ContextPolicy) -> Self {
        Self {
            policy,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Adds a user submission and returns the list to send.
    ///
    /// Under [`ContextPolicy::ResetEachTurn`] anything left over is dropped
    /// first, so the outbound list holds exactly this one message.
    pub fn push_user(&mut self, message: Message) -> Vec<Message> {
        if self.policy == ContextPolicy::ResetEachTurn && !self.messages.is_empty() {
            debug!(dropped = self.messages.len(), "Clearing stale model context");
            self.messages.clear();
        }
        self.messages.push(message);
        self.messages.clone()
    }

    /// Records a finalized assistant reply.
    pub fn push_assistant(&mut self, message: Message) {
        match self.policy {
            ContextPolicy::Accumulate => self.messages.push(message),
            ContextPolicy::ResetEachTurn => {}
        }
    }

    /// Removes a user message whose request never completed.
    pub fn discard(&mut self, message: &Message) {
        self.messages.retain(|m| m.id != message.id);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_policy_sends_only_newest_message() {
        let mut ctx = ModelContext::new(ContextPolicy::ResetEachTurn);
        let first = ctx.push_user(Message::user("一"));
        assert_eq!(first.len(), 1);

        ctx.push_assistant(Message::assistant("{}"));
        let second = ctx.push_user(Message::user("二"));
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].text, "二");
    }

    #[test]
    fn accumulate_policy_keeps_history() {
        let mut ctx = ModelContext::new(ContextPolicy::Accumulate);
        ctx.push_user(Message::user("一"));
        ctx.push_assistant(Message::assistant("{}"));
        let sent = ctx.push_user(Message::user("二"));
        assert_eq!(sent.len(), 3);
    }

    #[test]
    fn discard_removes_only_that_message() {
        let mut ctx = ModelContext::new(ContextPolicy::Accumulate);
        ctx.push_user(Message::user("一"));
        let failed = Message::user("二");
        ctx.push_user(failed.clone());
        ctx.discard(&failed);
        assert_eq!(ctx.messages().len(), 1);
        assert_eq!(ctx.messages()[0].text, "一");
    }
}
