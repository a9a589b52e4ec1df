//! CancelRegistry — one cancellation handle per session.
//!
//! Sending a new message to a session that already has a generation in
//! flight preempts the stale one instead of queueing behind it. `begin`
//! cancels and replaces any existing handle atomically; the returned guard
//! carries a generation number so `end` only removes the handle it
//! installed (a later `begin` for the same session must not be clobbered
//! by the preempted caller's cleanup).

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

struct Entry {
    token: CancellationToken,
    generation: u64,
}

/// Registry of per-session cancellation handles.
pub struct CancelRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    next_generation: Mutex<u64>,
}

/// Scope handle returned by [`CancelRegistry::begin`].
pub struct CancelScope {
    pub token: CancellationToken,
    generation: u64,
}

impl Default for CancelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_generation: Mutex::new(0),
        }
    }

    /// Install a fresh handle for the session, cancelling any prior one.
    pub fn begin(&self, session_id: &str) -> CancelScope {
        let generation = {
            let mut next = self.next_generation.lock().expect("cancel lock poisoned");
            *next += 1;
            *next
        };

        let token = CancellationToken::new();
        let mut entries = self.entries.lock().expect("cancel lock poisoned");
        if let Some(prev) = entries.insert(
            session_id.to_string(),
            Entry {
                token: token.clone(),
                generation,
            },
        ) {
            prev.token.cancel();
            tracing::debug!(session_id = %session_id, "preempted in-flight generation");
        }

        CancelScope { token, generation }
    }

    /// Remove the handle installed by `scope`, if it is still the current one.
    pub fn end(&self, session_id: &str, scope: &CancelScope) {
        let mut entries = self.entries.lock().expect("cancel lock poisoned");
        if entries
            .get(session_id)
            .is_some_and(|e| e.generation == scope.generation)
        {
            entries.remove(session_id);
        }
    }

    /// Fire and remove the session's handle. No-op when none is registered.
    pub fn cancel(&self, session_id: &str) {
        let mut entries = self.entries.lock().expect("cancel lock poisoned");
        if let Some(entry) = entries.remove(session_id) {
            entry.token.cancel();
            tracing::info!(session_id = %session_id, "session cancelled");
        }
    }

    /// Number of registered handles (test observability).
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cancel lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
