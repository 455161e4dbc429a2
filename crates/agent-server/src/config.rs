//! Server Configuration

use std::time::Duration;

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a helpful AI assistant.

Use the provided tools when they help answer the question. After receiving
tool results, synthesize them into a helpful response. If a tool reports an
error, explain it or try a different approach.
If you can answer directly without tools, do so.
Be concise and accurate."#;

/// Settings read from the environment (and `.env`)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// `BIND_ADDR`
    pub bind_addr: String,

    /// `AGENT_SYSTEM_PROMPT`
    pub system_prompt: String,

    /// `AGENT_WINDOW`: keep only this many recent messages per session
    pub window: Option<usize>,

    /// `GATE_MIN_INTERVAL_MS`: minimum spacing between calls per client
    pub gate_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            window: None,
            gate_interval: Duration::from_millis(1000),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            system_prompt: std::env::var("AGENT_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
            window: std::env::var("AGENT_WINDOW").ok().and_then(|w| w.parse().ok()),
            gate_interval: std::env::var("GATE_MIN_INTERVAL_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map_or(defaults.gate_interval, Duration::from_millis),
        }
    }
}
