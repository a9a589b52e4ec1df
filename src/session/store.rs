//! SessionStore — JSON-file-backed session persistence.
//!
//! The backing file is a single indented JSON object keyed by session id.
//! A reader/writer lock protects the in-memory map; every mutating
//! operation rewrites the file while still holding the write lock, so the
//! on-disk state never lags an acknowledged mutation. A failed save is
//! logged as a warning and does not roll back the in-memory change — the
//! next successful save catches the file up.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use super::errors::StoreError;
use super::types::{Message, Session, SessionChild, TodoItem, TodoPriority, TodoStatus};
use crate::paths::DataPaths;

/// Thread-safe CRUD over sessions, mirrored to `sessions.json`.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    file: PathBuf,
}

/// Current time as milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SessionStore {
    /// Open the store, loading any existing sessions file.
    ///
    /// A missing or malformed file starts the store empty; the malformed
    /// case is logged so the user can recover the file by hand.
    pub fn open(paths: &DataPaths) -> Self {
        let file = paths.sessions_file();
        let sessions = match std::fs::read_to_string(&file) {
            Ok(data) => match serde_json::from_str::<HashMap<String, Session>>(&data) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "failed to parse sessions file, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            sessions: RwLock::new(sessions),
            file,
        }
    }

    /// Persist the full map. Caller must hold the write lock.
    fn save_locked(&self, sessions: &HashMap<String, Session>) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(sessions)?;
        std::fs::write(&self.file, data)?;
        Ok(())
    }

    /// Persist and downgrade any failure to a warning (spec'd behavior:
    /// an acknowledged mutation is never rolled back over a disk error).
    fn save_or_warn(&self, sessions: &HashMap<String, Session>) {
        if let Err(e) = self.save_locked(sessions) {
            tracing::warn!(file = %self.file.display(), error = %e, "failed to save sessions");
        }
    }

    // ─── CRUD ───────────────────────────────────────────────────────────

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Vec<Session> {
        let sessions = self.sessions.read().expect("sessions lock poisoned");
        let mut all: Vec<Session> = sessions.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    pub fn get(&self, session_id: &str) -> Result<Session, StoreError> {
        let sessions = self.sessions.read().expect("sessions lock poisoned");
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    pub fn create(&self, title: &str, parent_id: Option<&str>) -> Session {
        let now = now_ms();
        let title = if title.is_empty() { "New Session" } else { title };
        let session = Session {
            id: format!("session_{now}"),
            title: title.to_string(),
            summary: None,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            parent_id: parent_id.filter(|p| !p.is_empty()).map(str::to_string),
            todos: Vec::new(),
        };

        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        sessions.insert(session.id.clone(), session.clone());
        self.save_or_warn(&sessions);
        session
    }

    /// Rename a session. An empty title leaves it unchanged.
    pub fn update(&self, session_id: &str, title: &str) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        if !title.is_empty() {
            session.title = title.to_string();
            session.updated_at = now_ms();
        }
        let updated = session.clone();
        self.save_or_warn(&sessions);
        Ok(updated)
    }

    /// Delete a session and all of its messages.
    pub fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        if sessions.remove(session_id).is_none() {
            return Err(StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }
        self.save_or_warn(&sessions);
        Ok(())
    }

    // ─── Queries ────────────────────────────────────────────────────────

    /// The last `limit` messages of a session (all when `limit` is 0).
    pub fn messages(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        let session = self.get(session_id)?;
        let messages = session.messages;
        if limit > 0 && messages.len() > limit {
            Ok(messages[messages.len() - limit..].to_vec())
        } else {
            Ok(messages)
        }
    }

    /// Direct children of a session in the branch forest.
    pub fn children(&self, session_id: &str) -> Vec<SessionChild> {
        let sessions = self.sessions.read().expect("sessions lock poisoned");
        sessions
            .values()
            .filter(|s| s.parent_id.as_deref() == Some(session_id))
            .map(|s| SessionChild {
                id: s.id.clone(),
                title: s.title.clone(),
                state: "idle".to_string(),
            })
            .collect()
    }

    // ─── Mutations from the orchestrator ────────────────────────────────

    /// Append a (user, assistant) message pair atomically and advance
    /// `updated_at`. Either both frames land or neither does.
    pub fn append_messages(
        &self,
        session_id: &str,
        user: Message,
        assistant: Message,
        updated_at: i64,
    ) -> Result<Message, StoreError> {
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        session.messages.push(user);
        session.messages.push(assistant.clone());
        session.updated_at = updated_at;
        self.save_or_warn(&sessions);
        Ok(assistant)
    }

    /// Replace the session's todo list.
    pub fn set_todos(&self, session_id: &str, todos: Vec<TodoItem>) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        session.todos = todos;
        session.updated_at = now_ms();
        self.save_or_warn(&sessions);
        Ok(())
    }

    /// Store a generated summary on the session.
    pub fn set_summary(&self, session_id: &str, summary: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().expect("sessions lock poisoned");
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        session.summary = Some(summary.to_string());
        self.save_or_warn(&sessions);
        Ok(())
    }

    /// The session's todo list.
    ///
    /// When the session has no stored todos, falls back to scanning message
    /// text for `- [ ]` / `- [x]` checkbox lines (how very old sessions
    /// tracked tasks).
    pub fn todos(&self, session_id: &str) -> Result<Vec<TodoItem>, StoreError> {
        let session = self.get(session_id)?;
        if !session.todos.is_empty() {
            return Ok(session.todos);
        }

        let mut todos = Vec::new();
        for msg in &session.messages {
            let Some((_, text)) = msg.normalize() else {
                continue;
            };
            for line in text.lines() {
                let line = line.trim();
                let (content, status) = if let Some(rest) = line.strip_prefix("- [ ] ") {
                    (rest, TodoStatus::Pending)
                } else if let Some(rest) = line.strip_prefix("- [x] ") {
                    (rest, TodoStatus::Completed)
                } else {
                    continue;
                };
                todos.push(TodoItem {
                    id: String::new(),
                    content: content.to_string(),
                    status,
                    priority: TodoPriority::Medium,
                });
            }
        }
        Ok(todos)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
