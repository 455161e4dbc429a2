//! Ollama Model Adapter
//!
//! Implementation of `ModelAdapter` for an Ollama `/api/chat` backend.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{ModelAdapter, ModelRequest},
    tool::{Tool, ToolCall},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

/// Ollama adapter configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://localhost:11434`
    pub endpoint: String,

    /// Model name sent with every request
    pub model: String,

    /// Context budget reported to compaction strategies
    pub token_limit: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Extra top-level request fields (`options`, `keep_alive`, `think`, ...)
    pub options: Map<String, Value>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            token_limit: 8192,
            timeout_secs: 120,
            options: Map::new(),
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| "http://localhost".into());
        let port: u16 = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model);
        let token_limit = std::env::var("OLLAMA_TOKEN_LIMIT")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(defaults.token_limit);

        Self {
            endpoint: format!("{}:{}", host.trim_end_matches('/'), port),
            model,
            token_limit,
            ..defaults
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Ollama model adapter
pub struct OllamaAdapter {
    client: Client,
    config: OllamaConfig,
}

impl OllamaAdapter {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    /// Create with default localhost settings
    pub fn localhost() -> Result<Self> {
        Self::from_config(OllamaConfig::default())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    /// List locally available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(AgentError::ProviderStatus { status: status.as_u16(), body });
        }

        let tags: TagsResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::Parse(format!("model list: {}", e)))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn payload(&self, request: ModelRequest<'_>) -> Value {
        let mut payload = self.config.options.clone();
        payload.insert("stream".into(), json!(false));
        payload.insert("model".into(), json!(self.config.model));
        payload.insert("messages".into(), Value::Array(messages_to_wire(request.messages)));
        payload.insert("tools".into(), Value::Array(tools_to_wire(request.tools)));
        Value::Object(payload)
    }
}

#[async_trait]
impl ModelAdapter for OllamaAdapter {
    async fn invoke(&self, request: ModelRequest<'_>) -> Result<Message> {
        let url = self.url("/api/chat");
        let payload = self.payload(request);

        info!(
            model = self.config.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Ollama request failed");
            return Err(AgentError::ProviderStatus { status: status.as_u16(), body });
        }

        debug!("Received response from Ollama");

        let reply: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::Parse(format!("chat response: {}", e)))?;
        reply_to_message(reply)
    }

    fn token_limit(&self) -> usize {
        self.config.token_limit
    }

    fn name(&self) -> &str {
        &self.config.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() {
        AgentError::ProviderUnavailable(err.to_string())
    } else {
        AgentError::Provider(err.to_string())
    }
}

/// Convert agent messages to Ollama's chat format
///
/// A tool-role message expands into one wire message per tool result; every
/// other role becomes a single message with content and thinking each
/// concatenated.
pub fn messages_to_wire(messages: &[Message]) -> Vec<Value> {
    messages.iter().flat_map(message_to_wire).collect()
}

fn message_to_wire(message: &Message) -> Vec<Value> {
    if message.role().is(Role::TOOL) {
        return message
            .tool_results()
            .into_iter()
            .map(|result| {
                json!({
                    "role": Role::TOOL,
                    "name": result.tool_name(),
                    "content": result.result().to_string(),
                })
            })
            .collect();
    }

    let mut wire = json!({
        "role": message.role().as_str(),
        "content": message.text(),
    });

    let thinking = message.thinking();
    if !thinking.is_empty() {
        wire["thinking"] = json!(thinking);
    }

    let calls: Vec<Value> = message
        .tool_calls()
        .into_iter()
        .map(|call| {
            json!({
                "function": {
                    "name": call.name(),
                    "arguments": call.arguments(),
                }
            })
        })
        .collect();
    if !calls.is_empty() {
        wire["tool_calls"] = Value::Array(calls);
    }

    vec![wire]
}

/// Convert tools to Ollama's function schema format
pub fn tools_to_wire(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            let schema = tool.schema();
            let properties: Map<String, Value> = schema
                .parameters
                .iter()
                .map(|p| {
                    (
                        p.name.clone(),
                        json!({ "type": p.param_type, "description": p.description }),
                    )
                })
                .collect();
            let required: Vec<&str> = schema
                .parameters
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.as_str())
                .collect();

            json!({
                "type": "function",
                "function": {
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }
                }
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct WireMessage {
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    thinking: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    call_type: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
    #[serde(default)]
    index: Option<u32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

/// Convert an Ollama reply into exactly one message
fn reply_to_message(reply: ChatResponse) -> Result<Message> {
    let wire = reply
        .message
        .ok_or_else(|| AgentError::Parse("chat response: missing message".into()))?;

    let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());

    let mut builder = Message::builder()
        .role(wire.role.unwrap_or_else(|| Role::ASSISTANT.into()))
        .thinking(non_empty(wire.thinking))
        .content(non_empty(wire.content));

    for call in wire.tool_calls.unwrap_or_default() {
        builder = builder.tool_call(Some(wire_to_call(call)));
    }

    Ok(builder.build())
}

fn wire_to_call(call: WireToolCall) -> ToolCall {
    let WireFunction { name, arguments, index } = call.function;

    // Some models send arguments as a JSON-encoded string
    let arguments = match arguments {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Value::Null => json!({}),
        other => other,
    };

    let tool_call = match call.id {
        Some(id) if !id.is_empty() => ToolCall::with_id(id, name, arguments),
        _ => ToolCall::new(name, arguments),
    };

    let tool_call = tool_call.with_sequence(index.unwrap_or(0));
    match call.call_type {
        Some(call_type) => tool_call.with_call_type(call_type),
        None => tool_call,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{Agent, FnTool, ParameterSchema, ToolResult, ToolSchema};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn echo_tool() -> Arc<dyn Tool> {
        Arc::new(FnTool::new(
            "echo",
            "Echo a value back",
            ToolSchema {
                parameters: vec![
                    ParameterSchema::new("value", "string", "Value to echo").required(),
                    ParameterSchema::new("loud", "boolean", "Shout it"),
                ],
                output: "The received value".into(),
            },
            |args| async move { Ok(json!({ "received": args["value"] })) },
        ))
    }

    fn adapter_for(server: &MockServer) -> OllamaAdapter {
        let config = OllamaConfig {
            endpoint: server.uri(),
            model: "test-model".into(),
            ..Default::default()
        }
        .with_option("options", json!({"temperature": 0.1}));
        OllamaAdapter::from_config(config).unwrap()
    }

    async fn request_bodies(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert_eq!(config.token_limit, 8192);
    }

    #[test]
    fn test_message_conversion() {
        let call = ToolCall::new("echo", json!({"value": "ping"}));
        let tool_message = Message::builder()
            .role(Role::tool())
            .tool_result(Some(ToolResult::of(&call, json!({"received": "ping"}))))
            .tool_result(Some(ToolResult::of(&call, json!(2))))
            .build();
        let messages = vec![
            Message::system("You are helpful."),
            Message::builder()
                .role(Role::assistant())
                .thinking(Some("let me "))
                .content(Some("Checking"))
                .thinking(Some("think"))
                .content(Some("..."))
                .tool_call(Some(call))
                .build(),
            tool_message,
        ];

        let converted = messages_to_wire(&messages);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0], json!({"role": "system", "content": "You are helpful."}));
        assert_eq!(converted[1]["content"], "Checking...");
        assert_eq!(converted[1]["thinking"], "let me think");
        assert_eq!(
            converted[1]["tool_calls"],
            json!([{"function": {"name": "echo", "arguments": {"value": "ping"}}}])
        );
        assert_eq!(
            converted[2],
            json!({"role": "tool", "name": "echo", "content": "{\"received\":\"ping\"}"})
        );
        assert_eq!(converted[3]["content"], "2");
    }

    #[test]
    fn test_tool_conversion() {
        let wire = tools_to_wire(&[echo_tool()]);
        assert_eq!(
            wire[0],
            json!({
                "type": "function",
                "function": {
                    "name": "echo",
                    "description": "Echo a value back",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "value": {"type": "string", "description": "Value to echo"},
                            "loud": {"type": "boolean", "description": "Shout it"}
                        },
                        "required": ["value"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_reply_parsing() {
        let reply: ChatResponse = serde_json::from_value(json!({
            "message": {
                "role": "assistant",
                "content": "",
                "thinking": "need the echo tool",
                "tool_calls": [
                    {"function": {"name": "echo", "arguments": {"value": "b"}, "index": 1}},
                    {"id": "call_7", "function": {"name": "echo", "arguments": "{\"value\":\"a\"}"}}
                ]
            }
        }))
        .unwrap();

        let message = reply_to_message(reply).unwrap();
        assert_eq!(message.components().len(), 3);
        assert_eq!(message.thinking(), "need the echo tool");
        assert_eq!(message.text(), "");

        let calls = message.tool_calls();
        assert_eq!(calls[0].sequence(), 1);
        assert!(!calls[0].id().is_empty());
        assert_eq!(calls[1].id(), "call_7");
        assert_eq!(calls[1].arguments(), &json!({"value": "a"}));
    }

    #[test]
    fn test_reply_without_message_is_parse_error() {
        let reply: ChatResponse = serde_json::from_value(json!({"done": true})).unwrap();
        assert!(matches!(reply_to_message(reply), Err(AgentError::Parse(_))));
    }

    #[tokio::test]
    async fn test_invoke_posts_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "test-model",
                "message": {"role": "assistant", "content": "Hello!"},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let history = vec![Message::user("Hi")];
        let tools = vec![echo_tool()];
        let reply = adapter.invoke(ModelRequest::new(&history, &tools)).await.unwrap();

        assert_eq!(reply.role().as_str(), "assistant");
        assert_eq!(reply.text(), "Hello!");
        assert!(reply.is_terminal());

        let body = &request_bodies(&server).await[0];
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.1);
        assert_eq!(body["messages"], json!([{"role": "user", "content": "Hi"}]));
        assert_eq!(body["tools"][0]["function"]["name"], "echo");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let history = vec![Message::user("Hi")];
        let err = adapter.invoke(ModelRequest::new(&history, &[])).await.unwrap_err();

        match err {
            AgentError::ProviderStatus { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let err = adapter.invoke(ModelRequest::new(&[], &[])).await.unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[tokio::test]
    async fn test_health_and_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "llama3.2:latest"}, {"name": "qwen3:8b"}]
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        assert!(adapter.health_check().await.unwrap());
        assert_eq!(adapter.list_models().await.unwrap(), vec!["llama3.2:latest", "qwen3:8b"]);
    }

    #[tokio::test]
    async fn test_agent_round_trip_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{"function": {"name": "echo", "arguments": {"value": "ping"}}}]
                }
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "It said ping."}
            })))
            .mount(&server)
            .await;

        let mut agent = Agent::builder()
            .system_prompt("Use tools.")
            .model(Arc::new(adapter_for(&server)))
            .tool_arc(echo_tool())
            .on_response(|_| {})
            .build()
            .unwrap();

        let reply = agent.invoke("echo ping").await.unwrap();
        assert_eq!(reply.text(), "It said ping.");

        let bodies = request_bodies(&server).await;
        assert_eq!(bodies.len(), 2);

        let second = bodies[1]["messages"].as_array().unwrap();
        let roles: Vec<_> = second.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(second[2]["tool_calls"][0]["function"]["name"], "echo");
        assert_eq!(second[3]["name"], "echo");
        assert_eq!(second[3]["content"], "{\"received\":\"ping\"}");
    }
}
