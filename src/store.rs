//! In-memory session registry with an admission limit
//!
//! The store holds read-only snapshots published by running
//! orchestrators. It is an explicit object owned by the service that
//! created it; there is no process-wide registry.

use crate::error::{Error, Result};
use crate::session::Session;
use crate::types::SessionId;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Registry of session snapshots keyed by session ID
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
    /// Serializes admission checks so the limit cannot be raced past
    admission: Mutex<()>,
    max_running: usize,
}

impl SessionStore {
    /// Create a store admitting at most `max_running` non-terminal sessions
    pub fn new(max_running: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            admission: Mutex::new(()),
            max_running,
        }
    }

    /// Admit a new session, enforcing the running-session limit
    ///
    /// Sessions beyond the limit are rejected with
    /// [`Error::CapacityExceeded`]; queueing is the caller's business.
    pub fn admit(&self, session: Session) -> Result<()> {
        let _guard = self.admission.lock();
        let running = self.running_count();
        if running >= self.max_running {
            return Err(Error::CapacityExceeded {
                running,
                max: self.max_running,
            });
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// Publish an updated snapshot of a session
    pub fn publish(&self, session: &Session) {
        self.sessions.insert(session.id, session.clone());
    }

    /// Read a session snapshot
    pub fn snapshot(&self, id: SessionId) -> Option<Session> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Read a session snapshot, failing when absent
    pub fn get(&self, id: SessionId) -> Result<Session> {
        self.snapshot(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Number of sessions that have not reached a terminal status
    pub fn running_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| !entry.is_terminal())
            .count()
    }

    /// Total number of stored sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict terminal sessions older than the given age, returning the
    /// number removed
    pub fn evict_finished(&self, older_than: chrono::Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let stale: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| {
                entry.is_terminal()
                    && entry
                        .completed_at
                        .map(|at| at < cutoff)
                        .unwrap_or(entry.created_at < cutoff)
            })
            .map(|entry| entry.id)
            .collect();

        for id in &stale {
            self.sessions.remove(id);
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;

    fn session() -> Session {
        Session::new(
            "lunch",
            vec!["Sushi Bar".to_string(), "Ramen Shop".to_string()],
            false,
        )
        .unwrap()
    }

    #[test]
    fn admit_and_snapshot_round_trip() {
        let store = SessionStore::new(2);
        let s = session();
        let id = s.id;
        store.admit(s).unwrap();

        let snapshot = store.snapshot(id).unwrap();
        assert_eq!(snapshot.id, id);
        assert!(store.get(SessionId::new()).is_err());
    }

    #[test]
    fn admission_limit_rejects_excess_sessions() {
        let store = SessionStore::new(1);
        store.admit(session()).unwrap();

        let err = store.admit(session()).unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded { running: 1, max: 1 }
        ));
    }

    #[test]
    fn terminal_sessions_free_admission_slots() {
        let store = SessionStore::new(1);
        let mut s = session();
        let id = s.id;
        store.admit(s.clone()).unwrap();

        s.status = SessionStatus::Failed;
        s.completed_at = Some(Utc::now());
        store.publish(&s);

        store.admit(session()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.snapshot(id).unwrap().status, SessionStatus::Failed);
    }

    #[test]
    fn evict_finished_removes_only_stale_terminal_sessions() {
        let store = SessionStore::new(4);
        let mut done = session();
        done.status = SessionStatus::Completed;
        done.completed_at = Some(Utc::now() - chrono::Duration::hours(2));
        let live = session();

        store.admit(done).unwrap();
        store.admit(live).unwrap();

        let evicted = store.evict_finished(chrono::Duration::hours(1));
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 1);
    }
}
