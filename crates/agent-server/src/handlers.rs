//! HTTP Handlers

use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, Session, SessionId};

use crate::gate::ConnectionInfo;
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub model_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Messages retained in the session after this request
    pub messages: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn agent_error(err: &AgentError) -> ApiError {
    match err {
        AgentError::Provider(_)
        | AgentError::ProviderUnavailable(_)
        | AgentError::ProviderStatus { .. }
        | AgentError::Parse(_) => error_response(StatusCode::BAD_GATEWAY, "MODEL_ERROR", err.user_message()),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR", err.user_message()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_available = state.model.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.model.name().to_string(),
        model_available,
    })
}

/// Run one agent turn for a session
///
/// The gate admits the request as a whole; model calls made by the tool loop
/// inside an admitted request are not gated again.
pub async fn chat_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if !state.gate.attempt_grant(&ConnectionInfo::from(addr)) {
        return Err(error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "You've made too many requests. Please wait a moment.",
        ));
    }

    let id = payload
        .session_id
        .map(SessionId::from_string)
        .unwrap_or_default();

    let lease = state.locks.lease(&id);
    let _guard = lease.lock().await;

    let mut session = state
        .sessions
        .load(&id)
        .map_err(|e| agent_error(&e))?
        .unwrap_or_else(|| Session::with_id(id.clone()));

    let mut agent = state.agent_for(&session).map_err(|e| {
        tracing::error!("Agent build error: {}", e);
        agent_error(&e)
    })?;

    let outcome = agent.invoke(payload.message).await;

    // Saved even on failure so a retry resumes from what was appended
    session.capture(&agent);
    state.sessions.save(&session).map_err(|e| agent_error(&e))?;

    let reply = outcome.map_err(|e| {
        tracing::error!(session = %id, "Agent error: {}", e);
        agent_error(&e)
    })?;

    let thinking = reply.thinking();

    Ok(Json(ChatResponse {
        session_id: id.to_string(),
        message: reply.text(),
        thinking: (!thinking.is_empty()).then_some(thinking),
        messages: session.message_count(),
    }))
}

/// Stored conversation for a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let id = SessionId::from_string(id);

    state
        .sessions
        .load(&id)
        .map_err(|e| agent_error(&e))?
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", format!("No session {}", id)))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use agent_core::{
        MemorySessionStore, Message, ModelAdapter, ModelRequest, Result, SessionStore, Tool,
        builtin::CalculatorTool, tool::ToolCall,
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        extract::connect_info::MockConnectInfo,
        http::{Request, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;
    use crate::gate::IntervalGate;
    use crate::state::SessionLocks;

    #[derive(Default)]
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<Message>>>,
        seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ModelAdapter for ScriptedModel {
        async fn invoke(&self, request: ModelRequest<'_>) -> Result<Message> {
            self.seen.lock().unwrap().push(request.messages.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Message::assistant("fallback")))
        }

        fn token_limit(&self) -> usize {
            2048
        }
    }

    struct Harness {
        app: Router,
        model: Arc<ScriptedModel>,
        sessions: Arc<MemorySessionStore>,
    }

    fn harness(replies: Vec<Result<Message>>, gate_interval: Duration) -> Harness {
        let model = Arc::new(ScriptedModel {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        });
        let sessions = Arc::new(MemorySessionStore::new());
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(CalculatorTool)];

        let state = AppState {
            model: model.clone(),
            tools: Arc::new(tools),
            sessions: sessions.clone(),
            locks: Arc::new(SessionLocks::default()),
            gate: Arc::new(IntervalGate::new(gate_interval)),
            config: Arc::new(ServerConfig::default()),
        };

        let app = crate::router(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));
        Harness { app, model, sessions }
    }

    async fn post_chat(app: &Router, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/api/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_chat_runs_tools_and_stores_session() {
        let call = ToolCall::new("calculate", json!({"expression": "6 * 7"}));
        let replies = vec![
            Ok(Message::builder().role("assistant").tool_call(Some(call)).build()),
            Ok(Message::builder()
                .role("assistant")
                .thinking(Some("the tool said 42"))
                .content(Some("42"))
                .build()),
        ];
        let h = harness(replies, Duration::ZERO);

        let (status, body) = post_chat(&h.app, json!({"message": "what is 6 * 7?"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "42");
        assert_eq!(body["thinking"], "the tool said 42");
        assert_eq!(body["messages"], 5);

        let id = SessionId::from_string(body["session_id"].as_str().unwrap());
        let stored = h.sessions.load(&id).unwrap().unwrap();
        let tool_result = stored.messages[3].tool_results()[0].clone();
        assert_eq!(tool_result.result()["value"], 42.0);
    }

    #[tokio::test]
    async fn test_session_continues_across_requests() {
        let h = harness(vec![Ok(Message::assistant("one")), Ok(Message::assistant("two"))], Duration::ZERO);

        let (_, first) = post_chat(&h.app, json!({"message": "a", "session_id": "s-1"})).await;
        let (_, second) = post_chat(&h.app, json!({"message": "b", "session_id": "s-1"})).await;

        assert_eq!(first["session_id"], "s-1");
        assert_eq!(second["message"], "two");
        assert_eq!(second["messages"], 5);
        assert_eq!(*h.model.seen.lock().unwrap(), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_gate_rejects_rapid_calls() {
        let h = harness(vec![Ok(Message::assistant("hi"))], Duration::from_secs(3600));

        let (first, _) = post_chat(&h.app, json!({"message": "a"})).await;
        let (second, body) = post_chat(&h.app, json!({"message": "b"})).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "RATE_LIMITED");
        assert_eq!(h.model.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admitted_request_completes_tool_loop() {
        let call = ToolCall::new("calculate", json!({"expression": "1 + 1"}));
        let replies = vec![
            Ok(Message::builder().role("assistant").tool_call(Some(call)).build()),
            Ok(Message::assistant("2")),
        ];
        let h = harness(replies, Duration::from_secs(3600));

        let (status, body) = post_chat(&h.app, json!({"message": "1 + 1?"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "2");
        assert_eq!(h.model.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_keeps_history() {
        let failure = Err(AgentError::ProviderStatus { status: 500, body: "boom".into() });
        let h = harness(vec![failure], Duration::ZERO);

        let (status, body) = post_chat(&h.app, json!({"message": "a", "session_id": "s-2"})).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "MODEL_ERROR");

        let stored = h.sessions.load(&SessionId::from_string("s-2")).unwrap().unwrap();
        assert_eq!(stored.message_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let h = harness(Vec::new(), Duration::ZERO);

        let request = Request::get("/api/sessions/missing").body(Body::empty()).unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
