//! Session Management
//!
//! Serializable snapshots of an agent's conversation, so a session can be
//! stored between requests and resumed with [`AgentBuilder::history`].
//!
//! [`AgentBuilder::history`]: crate::reasoning::AgentBuilder::history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};
use crate::reasoning::Agent;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session title (auto-generated or user-set)
    pub title: Option<String>,

    /// Model used for this session
    pub model: Option<String>,

    /// Custom tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Snapshot of one agent session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Conversation history
    pub messages: Vec<Message>,

    pub metadata: SessionMetadata,

    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, empty session
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the stored history with the agent's current one
    pub fn capture(&mut self, agent: &Agent) {
        self.messages = agent.history().to_vec();
        self.metadata.model = Some(agent.model().name().to_string());
        self.touch();
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Set session title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.metadata.title = Some(title.into());
        self.touch();
    }

    /// Get or generate title
    pub fn title(&self) -> String {
        self.metadata.title.clone().unwrap_or_else(|| {
            // Generate from first user message
            self.messages
                .iter()
                .find(|m| m.role().is(Role::USER))
                .map(|m| {
                    let content = m.text();
                    let preview: String = content.chars().take(50).collect();
                    if content.chars().count() > 50 {
                        format!("{}...", preview)
                    } else {
                        preview
                    }
                })
                .unwrap_or_else(|| format!("Session {}", self.id.0.chars().take(8).collect::<String>()))
        })
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session store trait for persistence
pub trait SessionStore: Send + Sync {
    /// Save a session
    fn save(&self, session: &Session) -> Result<()>;

    /// Load a session by ID
    fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Delete a session
    fn delete(&self, id: &SessionId) -> Result<()>;

    /// List sessions, most recently active first
    fn list(&self, limit: usize) -> Result<Vec<Session>>;
}

/// In-memory session store (for development/testing)
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> AgentError {
    AgentError::Session("session store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(id);
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        let mut result: Vec<_> = sessions.values().cloned().collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ModelAdapter, ModelRequest};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Parrot;

    #[async_trait]
    impl ModelAdapter for Parrot {
        async fn invoke(&self, request: ModelRequest<'_>) -> Result<Message> {
            let last = request.messages.last().map(Message::text).unwrap_or_default();
            Ok(Message::assistant(last))
        }

        fn token_limit(&self) -> usize {
            512
        }

        fn name(&self) -> &str {
            "parrot"
        }
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new();
        assert_eq!(session.message_count(), 0);
        assert!(session.title().starts_with("Session "));
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        let session = Session::new();
        let id = session.id.clone();

        store.save(&session).unwrap();

        let loaded = store.load(&id).unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().id, id);

        store.delete(&id).unwrap();
        assert!(store.load(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_capture_and_resume() {
        let model: Arc<dyn ModelAdapter> = Arc::new(Parrot);
        let mut agent = Agent::builder()
            .system_prompt("Repeat after me.")
            .model(model.clone())
            .on_response(|_| {})
            .build()
            .unwrap();
        agent.invoke("hello there").await.unwrap();

        let mut session = Session::new();
        session.capture(&agent);
        assert_eq!(session.message_count(), 3);
        assert_eq!(session.title(), "hello there");
        assert_eq!(session.metadata.model.as_deref(), Some("parrot"));

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();

        let mut resumed = Agent::builder()
            .system_prompt("Repeat after me.")
            .model(model)
            .history(restored.messages)
            .on_response(|_| {})
            .build()
            .unwrap();
        let reply = resumed.invoke("again").await.unwrap();

        assert_eq!(reply.text(), "again");
        assert_eq!(resumed.history().len(), 5);
    }
}
