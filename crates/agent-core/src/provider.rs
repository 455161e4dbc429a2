//! Model Adapter Strategy
//!
//! Defines the seam between the agent loop and any model backend (Ollama,
//! OpenAI, Anthropic, ...). A backend takes the full history plus the tool
//! list and answers with exactly one [`Message`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_core::provider::{ModelAdapter, ModelRequest};
//!
//! let reply = adapter.invoke(ModelRequest::new(&history, &tools)).await?;
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::message::Message;
use crate::tool::Tool;

/// One model turn's input
#[derive(Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Full ordered history, after compaction
    pub messages: &'a [Message],

    /// Every registered tool
    pub tools: &'a [Arc<dyn Tool>],
}

impl<'a> ModelRequest<'a> {
    pub fn new(messages: &'a [Message], tools: &'a [Arc<dyn Tool>]) -> Self {
        Self { messages, tools }
    }
}

impl std::fmt::Debug for ModelRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRequest")
            .field("messages", &self.messages.len())
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Strategy trait for model backends
///
/// Implement this trait to add support for new backends. The agent works
/// exclusively through this interface. Retry policy, if any, belongs here
/// or with the caller; the agent treats any error as fatal for the turn.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Produce the next message for the conversation
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<Message>;

    /// Context budget hint for compaction strategies
    fn token_limit(&self) -> usize;

    /// Identifier used in logs
    fn name(&self) -> &str {
        "model"
    }

    /// Check if the backend is reachable and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
