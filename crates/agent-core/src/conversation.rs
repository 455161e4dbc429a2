//! Conversation History
//!
//! Append-only message log. Every append is followed by a pass through the
//! attached [`CompactionStrategy`], so the next read already reflects it.

use crate::message::{Message, Role};
use crate::provider::ModelAdapter;

/// Policy applied to the history after every append
pub trait CompactionStrategy: Send + Sync {
    /// Return the history to retain. Must not depend on mutating `messages`
    /// and must keep surviving messages in their original order.
    fn compact(&self, messages: &[Message]) -> Vec<Message>;

    /// Called once when the owning agent is built
    fn configure(&mut self, model: &dyn ModelAdapter);
}

/// Keeps everything
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityCompaction;

impl CompactionStrategy for IdentityCompaction {
    fn compact(&self, messages: &[Message]) -> Vec<Message> {
        messages.to_vec()
    }

    fn configure(&mut self, _model: &dyn ModelAdapter) {}
}

/// Keeps only the most recent `keep_last` messages
///
/// With `preserve_system`, a leading system message survives as well and is
/// counted against the window.
#[derive(Clone, Copy, Debug)]
pub struct SlidingWindowCompaction {
    keep_last: usize,
    preserve_system: bool,
}

impl SlidingWindowCompaction {
    pub fn new(keep_last: usize) -> Self {
        Self {
            keep_last,
            preserve_system: false,
        }
    }

    pub fn preserve_system(mut self) -> Self {
        self.preserve_system = true;
        self
    }
}

impl CompactionStrategy for SlidingWindowCompaction {
    fn compact(&self, messages: &[Message]) -> Vec<Message> {
        if messages.len() <= self.keep_last {
            return messages.to_vec();
        }

        let pinned = match messages.first() {
            Some(first) if self.preserve_system && first.role().is(Role::SYSTEM) && self.keep_last > 0 => Some(first),
            _ => None,
        };

        let tail_len = self.keep_last - usize::from(pinned.is_some());
        let tail = &messages[messages.len() - tail_len..];

        pinned.into_iter().chain(tail).cloned().collect()
    }

    fn configure(&mut self, model: &dyn ModelAdapter) {
        tracing::debug!(
            model = model.name(),
            keep_last = self.keep_last,
            "Sliding window compaction configured"
        );
    }
}

/// Conversation history with its compaction policy
pub struct Conversation {
    messages: Vec<Message>,
    strategy: Box<dyn CompactionStrategy>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(Box::new(IdentityCompaction))
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    pub fn new(strategy: Box<dyn CompactionStrategy>) -> Self {
        Self {
            messages: Vec::new(),
            strategy,
        }
    }

    /// Restore a previously captured history
    ///
    /// The history is taken as-is; compaction applies from the next append.
    pub fn from_messages(messages: Vec<Message>, strategy: Box<dyn CompactionStrategy>) -> Self {
        Self { messages, strategy }
    }

    /// Add a message, then compact
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.messages = self.strategy.compact(&self.messages);
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
