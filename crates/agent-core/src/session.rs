//! Conversation Store
//!
//! Process-wide map from conversation id to message history. Histories are
//! seeded with a system prompt on first use and only grow afterwards.
//! Idle conversations expire after a TTL and the store never holds more
//! than a fixed number of conversations (least recently used goes first).
//!
//! Concurrent turns on the same id are not serialized: two requests racing
//! on one conversation may interleave their appends.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};

/// Unique conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Use the supplied id, or generate one when absent or blank
    pub fn or_generate(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some(id) if !id.is_empty() => Self::from_string(id),
            _ => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Eviction policy for the store
#[derive(Clone, Copy, Debug)]
pub struct StoreLimits {
    /// Idle time after which a conversation is dropped
    pub ttl: Duration,

    /// Maximum number of live conversations
    pub max_conversations: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_conversations: 1000,
        }
    }
}

struct Session {
    conversation: Conversation,
    last_used: Instant,
}

impl Session {
    fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

/// In-memory conversation store
pub struct ConversationStore {
    sessions: RwLock<HashMap<ConversationId, Session>>,
    limits: StoreLimits,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl ConversationStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<ConversationId, Session>>> {
        self.sessions
            .write()
            .map_err(|_| AgentError::Session("conversation store lock poisoned".into()))
    }

    /// Return the history for `id`, creating it on first use.
    ///
    /// `seed` produces the system prompt and is only called when the id is
    /// unknown. A failing seed leaves the store untouched.
    pub fn get_or_create<F>(&self, id: &ConversationId, seed: F) -> Result<Conversation>
    where
        F: FnOnce() -> Result<String>,
    {
        {
            let mut sessions = self.write()?;
            if let Some(session) = sessions.get_mut(id) {
                session.touch();
                return Ok(session.conversation.clone());
            }
        }

        let system_prompt = seed()?;

        let mut sessions = self.write()?;
        if !sessions.contains_key(id) {
            if sessions.len() >= self.limits.max_conversations {
                Self::evict_least_recent(&mut sessions);
            }
            tracing::debug!(conversation_id = %id, "Created conversation");
        }
        let session = sessions.entry(id.clone()).or_insert_with(|| Session {
            conversation: Conversation::with_system_prompt(system_prompt),
            last_used: Instant::now(),
        });
        session.touch();
        Ok(session.conversation.clone())
    }

    /// Append a turn to an existing conversation
    pub fn append(&self, id: &ConversationId, message: Message) -> Result<()> {
        let mut sessions = self.write()?;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::Session(format!("unknown conversation: {id}")))?;
        session.conversation.push(message);
        session.touch();
        Ok(())
    }

    /// Snapshot of a conversation, if present
    pub fn history(&self, id: &ConversationId) -> Result<Option<Conversation>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| AgentError::Session("conversation store lock poisoned".into()))?;
        Ok(sessions.get(id).map(|s| s.conversation.clone()))
    }

    /// Drop a conversation. Returns whether it existed.
    pub fn evict(&self, id: &ConversationId) -> Result<bool> {
        Ok(self.write()?.remove(id).is_some())
    }

    /// Drop every conversation idle for at least the TTL. Returns the count.
    pub fn evict_expired(&self) -> Result<usize> {
        let ttl = self.limits.ttl;
        let mut sessions = self.write()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_used.elapsed() < ttl);
        Ok(before - sessions.len())
    }

    /// Number of live conversations
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_least_recent(sessions: &mut HashMap<ConversationId, Session>) {
        let oldest = sessions
            .iter()
            .min_by_key(|(_, s)| s.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            sessions.remove(&id);
            tracing::debug!(conversation_id = %id, "Evicted least recently used conversation");
        }
    }
}
