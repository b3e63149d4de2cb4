//! Per-message stream buffer.

use kaiwa_types::MessageId;

/// Running buffer for one in-flight assistant message.
#[derive(Debug, Clone)]
pub struct StreamAccumulator {
    message_id: MessageId,
    buffer: String,
    done: bool,
}

impl StreamAccumulator {
    pub fn new(message_id: MessageId) -> Self {
        Self {
            message_id,
            buffer: String::new(),
            done: false,
        }
    }

    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Appends a delivered fragment. Fragments after completion are dropped.
    pub fn push(&mut self, fragment: &str) {
        if self.done {
            return;
        }
        self.buffer.push_str(fragment);
    }

    pub fn finish(&mut self) {
        self.done = true;
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}
