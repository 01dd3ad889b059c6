//! Per-session state shared across turns.
//!
//! Escalation decisions depend on what happened earlier in the same
//! conversation, so each (user, session) pair gets one [`SessionState`]
//! behind its own lock. Callers hold the lock for the whole turn, which
//! serializes concurrent requests for the same session while leaving other
//! sessions untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

/// Turns of history kept per session.
const HISTORY_LIMIT: usize = 20;

/// Mutable state of one conversation.
#[derive(Debug)]
pub struct SessionState {
    pending_confirmation: bool,
    history: Vec<String>,
    last_activity: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            pending_confirmation: false,
            history: Vec::new(),
            last_activity: Utc::now(),
        }
    }

    /// True while an emergency confirmation question is outstanding.
    pub fn pending_confirmation(&self) -> bool {
        self.pending_confirmation
    }

    pub fn set_pending_confirmation(&mut self, pending: bool) {
        self.pending_confirmation = pending;
        self.last_activity = Utc::now();
    }

    /// Record one user utterance, dropping the oldest past the cap.
    pub fn record_turn(&mut self, text: &str) {
        if self.history.len() >= HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push(text.to_string());
        self.last_activity = Utc::now();
    }

    /// Recent utterances, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    user_id: String,
    session_id: String,
}

/// Keeps one [`SessionState`] per (user, session) pair.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the state for a session, creating it on first use.
    pub async fn get_or_create(&self, user_id: &str, session_id: &str) -> Arc<Mutex<SessionState>> {
        let key = SessionKey {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        };
        if let Some(session) = self.sessions.read().await.get(&key) {
            return Arc::clone(session);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::new()))),
        )
    }

    /// Drop sessions idle longer than `idle`.
    ///
    /// A session awaiting emergency confirmation is never pruned, whatever
    /// its age: the outstanding question must survive until answered.
    pub async fn prune_stale(&self, idle: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(idle.as_secs() as i64);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(state) => state.pending_confirmation || state.last_activity > cutoff,
            // Locked means in use right now.
            Err(_) => true,
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
