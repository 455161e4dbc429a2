//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are frozen into a [`ToolSet`] when the agent is built and invoked by
//! the reasoning loop.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use crate::error::{AgentError, Result, ToolError};

fn default_call_type() -> String {
    "function".into()
}

/// Tool call request from the model
///
/// The correlation id is assigned at construction (provider-supplied or a
/// fresh UUID) and cannot change afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Ordering hint within one batch of calls
    #[serde(default)]
    sequence: u32,

    name: String,

    arguments: Value,

    #[serde(default = "default_call_type")]
    call_type: String,

    id: String,
}

impl ToolCall {
    /// New call with a locally generated id
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), name, arguments)
    }

    /// New call carrying a provider-supplied id
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            sequence: 0,
            name: name.into(),
            arguments,
            call_type: default_call_type(),
            id: id.into(),
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_call_type(mut self, call_type: impl Into<String>) -> Self {
        self.call_type = call_type.into();
        self
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &Value {
        &self.arguments
    }

    pub fn call_type(&self) -> &str {
        &self.call_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Result from tool execution, correlated to its [`ToolCall`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    call_id: String,

    /// Copied from the request, never looked up again
    tool_name: String,

    result: Value,
}

impl ToolResult {
    pub fn of(call: &ToolCall, result: Value) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            result,
        }
    }

    /// Result carrying a serialized failure
    pub fn failure(call: &ToolCall, error: &ToolError) -> Self {
        Self::of(
            call,
            json!({
                "error": error.to_string(),
                "kind": error.kind(),
            }),
        )
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn is_error(&self) -> bool {
        self.result.get("error").is_some() && self.result.get("kind").is_some()
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// Free-form type tag (string, number, boolean, object, array, ...)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn new(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Input/output schema consulted by the model
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Ordered parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Description of what the tool returns
    #[serde(default)]
    pub output: String,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model calls the tool by
    fn name(&self) -> &str;

    /// Human-readable description (shown to the model)
    fn description(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the model-supplied arguments
    async fn execute(&self, arguments: &Value) -> std::result::Result<Value, ToolError> {
        let _ = arguments;
        Ok(json!({}))
    }

    /// Validate arguments before execution (optional)
    fn validate(&self, arguments: &Value) -> std::result::Result<(), ToolError> {
        let schema = self.schema();

        for param in schema.parameters.iter().filter(|p| p.required) {
            if arguments.get(&param.name).is_none() {
                return Err(ToolError::Validation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

type ToolHandler = dyn Fn(Value) -> BoxFuture<'static, std::result::Result<Value, ToolError>> + Send + Sync;

/// Closure-backed tool for quick tool creation
pub struct FnTool {
    name: String,
    description: String,
    schema: ToolSchema,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ToolSchema,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, arguments: &Value) -> std::result::Result<Value, ToolError> {
        (self.handler)(arguments.clone()).await
    }
}

/// Frozen, ordered set of tools owned by one agent
///
/// Names are checked for emptiness and uniqueness up front. The name index
/// is built on first lookup and never invalidated since the set is immutable.
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: OnceLock<HashMap<String, usize>>,
}

impl Default for ToolSet {
    fn default() -> Self {
        Self {
            tools: Vec::new(),
            index: OnceLock::new(),
        }
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet").field("tools", &self.names()).finish()
    }
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        {
            let mut seen = std::collections::HashSet::new();
            for tool in &tools {
                let name = tool.name();
                if name.trim().is_empty() {
                    return Err(AgentError::Config("Tool name must not be empty".into()));
                }
                if !seen.insert(name) {
                    return Err(AgentError::Config(format!("Duplicate tool name: {}", name)));
                }
            }
        }

        Ok(Self {
            tools,
            index: OnceLock::new(),
        })
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        let index = self.index.get_or_init(|| {
            self.tools
                .iter()
                .enumerate()
                .map(|(i, tool)| (tool.name().to_string(), i))
                .collect()
        });
        index.get(name).map(|&i| &self.tools[i])
    }

    pub fn as_slice(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Get tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
