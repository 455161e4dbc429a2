//! Reasoning Loop
//!
//! Drives the conversation: ask the model, run every tool call it requests,
//! feed the results back, and repeat until a turn requests no tools.
//! Termination is entirely model-driven.

use serde_json::Value;
use std::sync::Arc;

use crate::conversation::{CompactionStrategy, Conversation, IdentityCompaction};
use crate::error::{AgentError, Result, ToolError};
use crate::message::Message;
use crate::provider::{ModelAdapter, ModelRequest};
use crate::tool::{Tool, ToolCall, ToolResult, ToolSet};

/// Observer invoked with every model reply before it is appended
pub type ResponseCallback = Box<dyn Fn(&Message) + Send + Sync>;

/// Default response observer: a structured log line per reply
pub fn log_response(message: &Message) {
    let thinking = message.thinking();
    if !thinking.is_empty() {
        tracing::info!(role = %message.role(), %thinking, "Model thinking");
    }

    let content = message.text();
    if !content.is_empty() {
        tracing::info!(role = %message.role(), %content, "Model content");
    }

    for call in message.tool_calls() {
        tracing::info!(tool = call.name(), id = call.id(), "Model requested tool");
    }
}

/// The main Agent struct
///
/// One agent owns one conversation. `invoke` takes `&mut self`, so callers
/// sharing an agent across tasks serialize access themselves.
pub struct Agent {
    name: String,
    system_prompt: Option<String>,
    tools: ToolSet,
    model: Arc<dyn ModelAdapter>,
    conversation: Option<Conversation>,
    /// Held until the conversation is created on first invoke
    strategy: Option<Box<dyn CompactionStrategy>>,
    on_response: ResponseCallback,
    max_turns: Option<usize>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("tools", &self.tools)
            .field("messages", &self.history().len())
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Run one user query to a terminal model turn
    ///
    /// Returns the terminal message. Tool failures are reported to the model
    /// as tool results; only model adapter failures are returned as errors,
    /// and whatever was appended before the failure stays in the history.
    pub async fn invoke(&mut self, query: impl Into<String>) -> Result<Message> {
        let strategy = &mut self.strategy;
        let system_prompt = self.system_prompt.as_deref();
        let conversation = self
            .conversation
            .get_or_insert_with(|| start_conversation(strategy.take(), system_prompt));

        conversation.append(Message::user(query));

        let mut turns = 0;
        loop {
            if let Some(max) = self.max_turns {
                if turns >= max {
                    return Err(AgentError::MaxTurns(max));
                }
            }
            turns += 1;

            let request = ModelRequest::new(conversation.messages(), self.tools.as_slice());
            tracing::info!(
                agent = %self.name,
                model = self.model.name(),
                turn = turns,
                messages = request.messages.len(),
                "Requesting model turn"
            );

            let reply = self.model.invoke(request).await?;
            (self.on_response)(&reply);
            conversation.append(reply.clone());

            let mut calls: Vec<ToolCall> = reply.tool_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                tracing::debug!(agent = %self.name, turns, "Terminal turn");
                return Ok(reply);
            }

            // Stable: equal sequence numbers keep emission order
            calls.sort_by_key(ToolCall::sequence);

            for call in &calls {
                let result = match execute_call(&self.tools, call).await {
                    Ok(value) => ToolResult::of(call, value),
                    Err(e) => {
                        tracing::warn!(tool = call.name(), id = call.id(), error = %e, "Tool call failed");
                        ToolResult::failure(call, &e)
                    }
                };
                conversation.append(Message::tool_result(result));
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Get the frozen tool set
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn model(&self) -> &Arc<dyn ModelAdapter> {
        &self.model
    }

    /// The conversation, once the first invoke created it
    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    /// Current history (empty before the first invoke)
    pub fn history(&self) -> &[Message] {
        self.conversation.as_ref().map(Conversation::messages).unwrap_or_default()
    }
}

fn start_conversation(strategy: Option<Box<dyn CompactionStrategy>>, system_prompt: Option<&str>) -> Conversation {
    let mut conversation = Conversation::new(strategy.unwrap_or_else(|| Box::new(IdentityCompaction)));
    if let Some(prompt) = system_prompt {
        conversation.append(Message::system(prompt));
    }
    conversation
}

async fn execute_call(tools: &ToolSet, call: &ToolCall) -> std::result::Result<Value, ToolError> {
    let tool = tools
        .get(call.name())
        .ok_or_else(|| ToolError::NotFound(call.name().to_string()))?;

    tracing::debug!(tool = call.name(), id = call.id(), sequence = call.sequence(), "Executing tool");

    tool.validate(call.arguments())?;
    tool.execute(call.arguments()).await
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    name: String,
    system_prompt: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    model: Option<Arc<dyn ModelAdapter>>,
    compaction: Box<dyn CompactionStrategy>,
    on_response: ResponseCallback,
    history: Option<Vec<Message>>,
    max_turns: Option<usize>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: "agent".into(),
            system_prompt: None,
            tools: Vec::new(),
            model: None,
            compaction: Box::new(IdentityCompaction),
            on_response: Box::new(log_response),
            history: None,
            max_turns: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn model(mut self, model: Arc<dyn ModelAdapter>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn compaction<S: CompactionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.compaction = Box::new(strategy);
        self
    }

    pub fn on_response<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.on_response = Box::new(callback);
        self
    }

    /// Resume from a previously captured history
    ///
    /// A non-empty history is used as-is and the system prompt is not
    /// prepended again; an empty one behaves as if none was given.
    pub fn history(mut self, messages: Vec<Message>) -> Self {
        self.history = Some(messages);
        self
    }

    pub fn max_turns(mut self, max: usize) -> Self {
        self.max_turns = Some(max);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| AgentError::Config("Model adapter is required".into()))?;

        let tools = ToolSet::new(self.tools)?;

        let mut compaction = self.compaction;
        compaction.configure(model.as_ref());

        // An empty history starts fresh so the system prompt is still seeded
        let (conversation, strategy) = match self.history.filter(|messages| !messages.is_empty()) {
            Some(messages) => (Some(Conversation::from_messages(messages, compaction)), None),
            None => (None, Some(compaction)),
        };

        tracing::debug!(agent = %self.name, tools = ?tools.names(), "Agent built");

        Ok(Agent {
            name: self.name,
            system_prompt: self.system_prompt,
            tools,
            model,
            conversation,
            strategy,
            on_response: self.on_response,
            max_turns: self.max_turns,
        })
    }
}
