//! # agent-core
//!
//! Provider-agnostic agent orchestration: a structured message model, a tool
//! contract, a compacting conversation log, and the loop that ties them to a
//! model backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Agent                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │  Reasoning  │  │   ToolSet   │  │    ModelAdapter      │  │
//! │  │    Loop     │──│  (frozen)   │──│    (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────────┘  │
//! │         │                                                    │
//! │  ┌──────────────────────────────────┐                        │
//! │  │ Conversation + CompactionStrategy│                        │
//! │  └──────────────────────────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop asks the model for a message, executes every tool call in it
//! (in sequence order, one at a time), appends one tool-result message per
//! call, and repeats until the model answers without tool calls.

pub mod builtin;
pub mod conversation;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod tool;

pub use conversation::{CompactionStrategy, Conversation, IdentityCompaction, SlidingWindowCompaction};
pub use error::{AgentError, Result, ToolError};
pub use message::{ComponentKind, Message, MessageBuilder, MessageComponent, Role};
pub use provider::{ModelAdapter, ModelRequest};
pub use reasoning::{Agent, AgentBuilder};
pub use session::{MemorySessionStore, Session, SessionId, SessionStore};
pub use tool::{FnTool, ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema, ToolSet};
