use parking_lot::Mutex;
use std::sync::Arc;

use crate::cache::{ContextId, ContextRegistry};
use crate::session::{MessageStore, SessionState};

/// Everything the session manager mutates
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub contexts: ContextRegistry,
    pub messages: MessageStore,
    pub session: SessionState,
}

/// Explicit state container shared by the orchestrator and its callers.
///
/// Cloning yields another handle to the same state. All mutation happens in
/// short closures that never span an `.await`, so each update is atomic with
/// respect to other tasks; only the ordering of whole updates can race.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    inner: Arc<Mutex<SessionData>>,
}

impl AppState {
    pub fn new(selected_context: ContextId) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionData {
                session: SessionState::new(selected_context),
                ..SessionData::default()
            })),
        }
    }

    /// Run a read-only query, typically one of the `selectors`
    pub fn read<T>(&self, query: impl FnOnce(&SessionData) -> T) -> T {
        query(&self.inner.lock())
    }

    /// Apply one atomic mutation
    pub fn update<T>(&self, mutation: impl FnOnce(&mut SessionData) -> T) -> T {
        mutation(&mut self.inner.lock())
    }

    /// Copy of the whole state, for rendering or assertions
    pub fn snapshot(&self) -> SessionData {
        self.inner.lock().clone()
    }
}
