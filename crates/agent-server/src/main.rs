//! agent-server
//!
//! Axum-based server hosting one agent session per conversation id, with
//! the connection gate in front of every model call.

mod config;
mod gate;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{
    MemorySessionStore, ModelAdapter, Tool,
    builtin::{CalculatorTool, DateTimeTool},
};
use agent_runtime::OllamaAdapter;

use crate::config::ServerConfig;
use crate::gate::IntervalGate;
use crate::handlers::{chat_handler, get_session, health_check};
use crate::state::{AppState, SessionLocks};

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/{id}", get(get_session))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so RUST_LOG from .env applies
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let ollama = OllamaAdapter::from_env()?;
    match ollama.health_check().await {
        Ok(true) => {
            tracing::info!(endpoint = %ollama.config().endpoint, "Connected to Ollama");
            if let Ok(models) = ollama.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("Ollama not available - chat requests will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }
    let model: Arc<dyn ModelAdapter> = Arc::new(ollama);

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(DateTimeTool), Arc::new(CalculatorTool)];
    tracing::info!("Registered {} tools:", tools.len());
    for tool in &tools {
        tracing::info!("  • {}", tool.name());
    }

    if let Some(window) = config.window {
        tracing::info!(window, "Sliding window compaction enabled");
    }

    let state = AppState {
        model,
        tools: Arc::new(tools),
        sessions: Arc::new(MemorySessionStore::new()),
        locks: Arc::new(SessionLocks::default()),
        gate: Arc::new(IntervalGate::new(config.gate_interval)),
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("agent-server running on http://{}", config.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health             - Health check");
    tracing::info!("  POST /api/chat           - Send message");
    tracing::info!("  GET  /api/sessions/{{id}} - Session history");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
