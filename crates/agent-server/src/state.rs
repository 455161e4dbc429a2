//! Application State

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use agent_core::{
    Agent, ModelAdapter, Result, Session, SessionId, SessionStore, SlidingWindowCompaction, Tool,
};

use crate::config::ServerConfig;
use crate::gate::ConnectionGate;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Model backend (Ollama, etc.)
    pub model: Arc<dyn ModelAdapter>,

    /// Tools handed to every session's agent
    pub tools: Arc<Vec<Arc<dyn Tool>>>,

    /// Conversation snapshots between requests
    pub sessions: Arc<dyn SessionStore>,

    /// One async lock per session
    pub locks: Arc<SessionLocks>,

    /// Admission check in front of model calls
    pub gate: Arc<dyn ConnectionGate>,

    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the agent for one request, resuming the session's history
    pub fn agent_for(&self, session: &Session) -> Result<Agent> {
        let mut builder = Agent::builder()
            .name(session.id.as_str())
            .system_prompt(self.config.system_prompt.clone())
            .model(self.model.clone())
            .tools(self.tools.iter().cloned());

        if let Some(window) = self.config.window {
            builder = builder.compaction(SlidingWindowCompaction::new(window).preserve_system());
        }

        builder.history(session.messages.clone()).build()
    }
}

type SessionLock = Arc<tokio::sync::Mutex<()>>;

/// Serializes requests that target the same session
///
/// Entries live only while some request holds a lease on them.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<SessionId, SessionLock>>,
}

impl SessionLocks {
    pub fn lease(&self, id: &SessionId) -> SessionLease<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(id.clone()).or_default().clone();
        SessionLease {
            locks: self,
            id: id.clone(),
            lock,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    // Leases are only handed out under the map lock, so a count of two
    // (map + departing lease) means nobody else is waiting
    fn release(&self, id: &SessionId, lock: &SessionLock) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(lock) == 2 {
            locks.remove(id);
        }
    }
}

/// Handle on one session's lock; drops the map entry when the last holder leaves
pub struct SessionLease<'a> {
    locks: &'a SessionLocks,
    id: SessionId,
    lock: SessionLock,
}

impl SessionLease<'_> {
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.id, &self.lock);
    }
}
