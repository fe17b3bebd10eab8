//! Per-session chat history and index-lifecycle commands.
//!
//! History is in-memory, append-only within a session, and cleared only by
//! explicit command. The delete-on-next-start flag is a marker file so it
//! survives a real process restart; it is consumed exactly once, at
//! startup, before any resource is constructed.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppPaths;
use crate::errors::KbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Vec<ChatTurn>>>>,
    pending_delete_path: PathBuf,
}

impl SessionStore {
    pub fn new(paths: &AppPaths) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            pending_delete_path: paths.pending_delete_path.clone(),
        }
    }

    /// Returns `session_id` if it names a known session, otherwise starts a
    /// fresh session and returns its id.
    pub fn ensure_session(&self, session_id: Option<String>) -> String {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        match session_id {
            Some(id) if sessions.contains_key(&id) => id,
            Some(id) => {
                sessions.insert(id.clone(), Vec::new());
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sessions.insert(id.clone(), Vec::new());
                id
            }
        }
    }

    pub fn record_turn(&self, session_id: &str, role: Role, content: String) {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        sessions.entry(session_id.to_string()).or_default().push(ChatTurn {
            role,
            content,
            at: Utc::now(),
        });
    }

    pub fn history(&self, session_id: &str) -> Vec<ChatTurn> {
        let sessions = self.sessions.lock().expect("session map poisoned");
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// Empties the chat history for one session; the index is untouched.
    pub fn clear_history(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().expect("session map poisoned");
        if let Some(turns) = sessions.get_mut(session_id) {
            turns.clear();
        }
    }

    /// Arms deletion of the persisted index at the start of the next
    /// process lifetime. Durable: the flag is a marker file.
    pub fn schedule_index_deletion(&self) -> Result<(), KbError> {
        fs::write(&self.pending_delete_path, b"").map_err(KbError::storage)?;
        tracing::info!("index deletion scheduled for next start");
        Ok(())
    }

    pub fn deletion_pending(&self) -> bool {
        self.pending_delete_path.exists()
    }
}

/// Consumes the pending-deletion flag. Returns whether it was set, and
/// resets it so it fires once. Called at startup before any resource is
/// touched.
pub fn take_pending_deletion(paths: &AppPaths) -> Result<bool, KbError> {
    if !paths.pending_delete_path.exists() {
        return Ok(false);
    }
    fs::remove_file(&paths.pending_delete_path).map_err(KbError::storage)?;
    Ok(true)
}
