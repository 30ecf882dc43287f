//! Live feedback sessions keyed by id.
//!
//! The registry lock is only held to insert, look up, remove or sweep. Each
//! session has its own lock, held by the caller for the whole of an operation
//! including the model call, so sessions never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, TryLockError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ChatError;
use crate::session::FeedbackSession;

pub type SharedSession = Arc<Mutex<FeedbackSession>>;

pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
    timeout: Duration,
}

impl SessionRegistry {
    /// Sessions idle longer than `timeout_minutes` are evicted by
    /// [`SessionRegistry::sweep_expired`].
    pub fn new(timeout_minutes: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: Duration::minutes(i64::from(timeout_minutes)),
        }
    }

    fn map(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, SharedSession>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::Storage(format!("session registry lock poisoned: {}", e)))
    }

    pub fn insert(&self, session: FeedbackSession) -> Result<SharedSession, ChatError> {
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.map()?.insert(id, Arc::clone(&shared));
        debug!(session_id = %id, "Session registered");
        Ok(shared)
    }

    pub fn get(&self, id: Uuid) -> Result<SharedSession, ChatError> {
        self.map()?
            .get(&id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(id))
    }

    /// Remove a session; returns whether it was present.
    pub fn remove(&self, id: Uuid) -> Result<bool, ChatError> {
        let removed = self.map()?.remove(&id).is_some();
        if removed {
            debug!(session_id = %id, "Session removed");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.map().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.map()
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Evict sessions idle longer than the configured timeout.
    pub fn sweep_expired(&self) -> Result<usize, ChatError> {
        self.sweep_idle_since(Utc::now() - self.timeout)
    }

    /// Evict sessions whose last activity is before `cutoff`.
    ///
    /// Sessions locked by an in-flight operation are in use and kept. A
    /// session whose lock is poisoned is evicted.
    pub fn sweep_idle_since(&self, cutoff: DateTime<Utc>) -> Result<usize, ChatError> {
        let mut sessions = self.map()?;
        let before = sessions.len();

        sessions.retain(|id, session| match session.try_lock() {
            Ok(guard) => guard.last_activity() >= cutoff,
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(_)) => {
                warn!(session_id = %id, "Evicting session with poisoned lock");
                false
            }
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Expired sessions swept");
        }
        Ok(evicted)
    }

    /// Poison the registry lock, as a panic while holding it would.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = self.sessions.lock();
                    panic!("session registry poisoned");
                })
                .join();
        });
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("timeout_minutes", &self.timeout.num_minutes())
            .finish()
    }
}
