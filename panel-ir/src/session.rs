//! Session parameter store collaborator
//!
//! The engine itself is stateless. Accumulated task parameters live in an
//! external key-value store keyed by session id; this module defines that
//! boundary and routes every write through the merge resolver so the
//! `task_id` of a session never changes once assigned.

use crate::error::IrResult;
use crate::merge::{MergeOutcome, MergeResolver, TaskParameters};
use panel_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Key-value store of task parameters by session id
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> Result<Option<TaskParameters>>;

    fn put(&self, session_id: &str, params: TaskParameters) -> Result<()>;

    /// Remove a session, returning its last parameters
    fn remove(&self, session_id: &str) -> Result<Option<TaskParameters>>;
}

/// Process-local store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, TaskParameters>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_id(session_id: &str) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(Error::InvalidInput("empty session id".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, TaskParameters>>> {
        self.sessions
            .lock()
            .map_err(|e| Error::Internal(format!("Session store lock poisoned: {}", e)))
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: &str) -> Result<Option<TaskParameters>> {
        Ok(self.lock()?.get(session_id).cloned())
    }

    fn put(&self, session_id: &str, params: TaskParameters) -> Result<()> {
        Self::check_id(session_id)?;
        self.lock()?.insert(session_id.to_string(), params);
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<Option<TaskParameters>> {
        Ok(self.lock()?.remove(session_id))
    }
}

/// Session parameters accessed through a store
pub struct SessionParameters<'a, S: SessionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: SessionStore + ?Sized> SessionParameters<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Parameters for a session, creating a new task if there are none
    pub fn start(&self, session_id: &str) -> IrResult<TaskParameters> {
        if let Some(existing) = self.store.get(session_id)? {
            return Ok(existing);
        }
        let params = TaskParameters::new_task();
        info!(session = session_id, task_id = ?params.task_id(), "Started task");
        self.store.put(session_id, params.clone())?;
        Ok(params)
    }

    /// Current parameters, if the session exists
    pub fn current(&self, session_id: &str) -> IrResult<Option<TaskParameters>> {
        Ok(self.store.get(session_id)?)
    }

    /// Merge an update into the session and persist the result
    ///
    /// Starts a task first if the session has none, so the stored
    /// parameters always carry a `task_id`.
    pub fn update(&self, session_id: &str, update: TaskParameters) -> IrResult<MergeOutcome> {
        let current = self.start(session_id)?;
        let outcome = MergeResolver::apply_update(&current, update);
        debug!(
            session = session_id,
            warnings = outcome.warnings.len(),
            "Session parameters updated"
        );
        self.store.put(session_id, outcome.params.clone())?;
        Ok(outcome)
    }

    /// Drop the session's parameters
    pub fn finish(&self, session_id: &str) -> IrResult<Option<TaskParameters>> {
        Ok(self.store.remove(session_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IrError;
    use serde_json::json;

    #[test]
    fn test_store_round_trip() {
        let store = InMemorySessionStore::new();
        assert!(store.get("s1").unwrap().is_none());
        store.put("s1", TaskParameters::new_task()).unwrap();
        assert!(store.get("s1").unwrap().is_some());
        assert!(store.remove("s1").unwrap().is_some());
        assert!(store.get("s1").unwrap().is_none());
    }

    #[test]
    fn test_empty_session_id_rejected() {
        let store = InMemorySessionStore::new();
        let err = SessionParameters::new(&store).start(" ").unwrap_err();
        assert!(matches!(err, IrError::Store(Error::InvalidInput(_))));
    }

    #[test]
    fn test_start_is_stable() {
        let store = InMemorySessionStore::new();
        let session = SessionParameters::new(&store);
        let first = session.start("s1").unwrap();
        let second = session.start("s1").unwrap();
        assert_eq!(first.task_id(), second.task_id());
    }

    #[test]
    fn test_update_keeps_task_id_at_store_boundary() {
        let store = InMemorySessionStore::new();
        let session = SessionParameters::new(&store);
        let original = session.start("s1").unwrap().task_id().unwrap().to_string();

        let update = TaskParameters::from_value(json!({"task_id": "hijack", "panel_name": "LP-9"})).unwrap();
        let outcome = session.update("s1", update).unwrap();
        assert_eq!(outcome.warnings.len(), 1);

        let stored = session.current("s1").unwrap().unwrap();
        assert_eq!(stored.task_id(), Some(original.as_str()));
        assert_eq!(stored.panel_name(), Some("LP-9"));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        let session = SessionParameters::new(&store);
        let a = session.start("a").unwrap();
        let b = session.start("b").unwrap();
        assert_ne!(a.task_id(), b.task_id());

        let dyn_store: &dyn SessionStore = &store;
        assert!(SessionParameters::new(dyn_store).finish("a").unwrap().is_some());
        assert!(store.get("b").unwrap().is_some());
    }
}
