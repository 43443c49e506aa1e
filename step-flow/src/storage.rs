use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{context::Context, error::Result};

/// Session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub graph_id: String,
    pub current_step_id: String,
    pub status_message: Option<String>,
    /// Message from the last rejected submission, if still relevant
    pub validation_error: Option<String>,
    /// Unsubmitted input for the current step only
    #[serde(default)]
    pub draft: Map<String, Value>,
    #[serde(default)]
    pub completed: bool,
    /// Submitted answers
    #[serde(default)]
    pub context: Context,
}

impl Session {
    pub fn new_from_step(sid: String, step_id: &str) -> Self {
        Self {
            id: sid,
            graph_id: "default".to_string(),
            current_step_id: step_id.to_string(),
            status_message: None,
            validation_error: None,
            draft: Map::new(),
            completed: false,
            context: Context::new(),
        }
    }

    /// Move to `step_id`, dropping whatever was typed on the step being left.
    pub fn move_to(&mut self, step_id: impl Into<String>) {
        self.current_step_id = step_id.into();
        self.draft.clear();
        self.validation_error = None;
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
///
/// Each entry remembers when it was last saved so idle sessions can be
/// pruned with [`prune_idle`](Self::prune_idle).
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, (Session, Instant)>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions not saved for at least `max_idle`. Returns how many went.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, (_, saved_at)| saved_at.elapsed() < max_idle);
        before.saturating_sub(self.sessions.len())
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions
            .insert(session.id.clone(), (session, Instant::now()));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.0.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
