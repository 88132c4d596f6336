//! Conversation sessions held in process memory.
//!
//! Each session keeps a bounded window of the most recent turns; older
//! turns are dropped from the front. Sessions are not persisted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

/// Source of the current time, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Who said something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("User"),
            Role::Assistant => f.write_str("Assistant"),
        }
    }
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug)]
struct Session {
    turns: VecDeque<ConversationTurn>,
    last_active: DateTime<Utc>,
}

/// Process-wide session store.
///
/// Sessions with different ids never interfere. Two concurrent queries on
/// the same id may interleave their appends.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    window: usize,
    clock: Clock,
}

impl SessionStore {
    /// Create a store that keeps at most `window` turns per session.
    pub fn new(window: usize) -> Self {
        Self::with_clock(window, Arc::new(Utc::now))
    }

    pub fn with_clock(window: usize, clock: Clock) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            window,
            clock,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    // A poisoned lock only means another thread panicked mid-update; the
    // map itself is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the given session id, creating the session if needed. Without
    /// an id a fresh one is generated.
    pub fn get_or_create(&self, session_id: Option<&str>) -> String {
        let id = match session_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let now = (self.clock)();
        let mut sessions = self.write();
        sessions
            .entry(id.clone())
            .and_modify(|s| s.last_active = now)
            .or_insert_with(|| {
                debug!("Created session {}", id);
                Session {
                    turns: VecDeque::new(),
                    last_active: now,
                }
            });
        id
    }

    /// Append a turn, evicting the oldest turns beyond the window.
    pub fn append(&self, session_id: &str, role: Role, text: &str) {
        let now = (self.clock)();
        let mut sessions = self.write();
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| Session {
            turns: VecDeque::new(),
            last_active: now,
        });

        session.turns.push_back(ConversationTurn {
            role,
            text: text.to_string(),
        });
        while session.turns.len() > self.window {
            session.turns.pop_front();
        }
        session.last_active = now;
    }

    /// Append a user question and the answer it received.
    pub fn append_exchange(&self, session_id: &str, question: &str, answer: &str) {
        self.append(session_id, Role::User, question);
        self.append(session_id, Role::Assistant, answer);
    }

    /// Retained turns, oldest first. Unknown sessions have no history.
    pub fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.read()
            .get(session_id)
            .map(|s| s.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// History as `User: ...` / `Assistant: ...` lines, or `None` if empty.
    pub fn format_history(&self, session_id: &str) -> Option<String> {
        let turns = self.history(session_id);
        if turns.is_empty() {
            return None;
        }
        Some(
            turns
                .iter()
                .map(|t| format!("{}: {}", t.role, t.text))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session's turns.
    pub fn clear(&self, session_id: &str) {
        if let Some(session) = self.write().get_mut(session_id) {
            session.turns.clear();
        }
    }

    /// Drop sessions idle for longer than `max_idle`. Returns how many were dropped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let cutoff = (self.clock)() - max_idle;
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active >= cutoff);
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {} idle sessions", pruned);
        }
        pruned
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
