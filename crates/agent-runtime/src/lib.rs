//! # agent-runtime
//!
//! Model adapters for the agent orchestration core.
//!
//! ## Adapters
//!
//! - **Ollama** (default): local inference over Ollama's `/api/chat`,
//!   with native tool calling and thinking traces
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{Agent, OllamaAdapter};
//!
//! let model = OllamaAdapter::from_env()?;
//! let mut agent = Agent::builder()
//!     .model(Arc::new(model))
//!     .build()?;
//! let reply = agent.invoke("What time is it?").await?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaAdapter, OllamaConfig};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, Message, ModelAdapter, Result, Role, Session, Tool, ToolSet,
};
