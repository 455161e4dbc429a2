//! Conversation Messages
//!
//! A [`Message`] is a role tag plus an ordered list of heterogeneous
//! [`MessageComponent`]s. Component order is significant and preserved so a
//! model adapter can rebuild any provider's wire shape from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// Role of a message sender
///
/// Opaque to the agent loop; only model adapters interpret it. The
/// constructors cover the conventional values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const SYSTEM: &'static str = "system";
    pub const USER: &'static str = "user";
    pub const ASSISTANT: &'static str = "assistant";
    pub const TOOL: &'static str = "tool";

    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    pub fn system() -> Self {
        Self::new(Self::SYSTEM)
    }

    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    pub fn assistant() -> Self {
        Self::new(Self::ASSISTANT)
    }

    pub fn tool() -> Self {
        Self::new(Self::TOOL)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, role: &str) -> bool {
        self.0 == role
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::user()
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Self::new(role)
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        Self(role)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discriminant of a [`MessageComponent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Content,
    Thinking,
    ToolCall,
    ToolResult,
}

/// Atomic unit of message content
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageComponent {
    /// Prose from the model or the user
    Content { text: String },
    /// Reasoning trace, advisory only
    Thinking { text: String },
    /// A requested tool invocation
    ToolCall(ToolCall),
    /// The outcome of a tool invocation
    ToolResult(ToolResult),
}

impl MessageComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            MessageComponent::Content { .. } => ComponentKind::Content,
            MessageComponent::Thinking { .. } => ComponentKind::Thinking,
            MessageComponent::ToolCall(_) => ComponentKind::ToolCall,
            MessageComponent::ToolResult(_) => ComponentKind::ToolResult,
        }
    }

    /// Text of a content or thinking component
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageComponent::Content { text } | MessageComponent::Thinking { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            MessageComponent::ToolCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        match self {
            MessageComponent::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,

    components: Vec<MessageComponent>,

    #[serde(default = "Utc::now")]
    created: DateTime<Utc>,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::builder().role(Role::system()).content(Some(content)).build()
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::builder().role(Role::user()).content(Some(content)).build()
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::builder().role(Role::assistant()).content(Some(content)).build()
    }

    /// Create a tool-role message carrying one result
    pub fn tool_result(result: ToolResult) -> Self {
        Self::builder().role(Role::tool()).tool_result(Some(result)).build()
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn components(&self) -> &[MessageComponent] {
        &self.components
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Components of exactly `kind`, in original order
    pub fn filter(&self, kind: ComponentKind) -> impl Iterator<Item = &MessageComponent> + '_ {
        self.components.iter().filter(move |c| c.kind() == kind)
    }

    /// Tool calls in the order the model emitted them
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.filter(ComponentKind::ToolCall)
            .filter_map(MessageComponent::as_tool_call)
            .collect()
    }

    pub fn tool_results(&self) -> Vec<&ToolResult> {
        self.filter(ComponentKind::ToolResult)
            .filter_map(MessageComponent::as_tool_result)
            .collect()
    }

    /// All content components concatenated
    pub fn text(&self) -> String {
        self.joined(ComponentKind::Content)
    }

    /// All thinking components concatenated
    pub fn thinking(&self) -> String {
        self.joined(ComponentKind::Thinking)
    }

    /// A message without tool calls ends the agent loop
    pub fn is_terminal(&self) -> bool {
        self.filter(ComponentKind::ToolCall).next().is_none()
    }

    fn joined(&self, kind: ComponentKind) -> String {
        self.filter(kind).filter_map(MessageComponent::as_text).collect()
    }
}

/// Incremental [`Message`] constructor
///
/// Every append method ignores `None`, so optional fields can be wired in
/// without branching at the call site.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    role: Option<Role>,
    components: Vec<MessageComponent>,
}

impl MessageBuilder {
    pub fn role(mut self, role: impl Into<Role>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn content(mut self, text: Option<impl Into<String>>) -> Self {
        if let Some(text) = text {
            self.components.push(MessageComponent::Content { text: text.into() });
        }
        self
    }

    pub fn thinking(mut self, text: Option<impl Into<String>>) -> Self {
        if let Some(text) = text {
            self.components.push(MessageComponent::Thinking { text: text.into() });
        }
        self
    }

    pub fn tool_call(mut self, call: Option<ToolCall>) -> Self {
        if let Some(call) = call {
            self.components.push(MessageComponent::ToolCall(call));
        }
        self
    }

    pub fn tool_result(mut self, result: Option<ToolResult>) -> Self {
        if let Some(result) = result {
            self.components.push(MessageComponent::ToolResult(result));
        }
        self
    }

    pub fn build(self) -> Message {
        Message {
            role: self.role.unwrap_or_default(),
            components: self.components,
            created: Utc::now(),
        }
    }
}
