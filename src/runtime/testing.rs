//! In-process fakes for exercising the orchestrator without a network

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use super::orchestrator::SessionOrchestrator;
use crate::app::{AppState, SessionConfig};
use crate::backend::{
    ConversationBackend, ConversationDetail, ModelInfo, SendTurnRequest, SendTurnResponse,
};
use crate::cache::ContextId;
use crate::models::{Provider, ProviderRegistry};
use crate::recovery::{MemoryQueue, ReauthNavigator};
use crate::session::{ConversationKey, ConversationSummary, Role, Turn};
use crate::utils::BackendError;

pub const PROVIDER: &str = "p1";
pub const PROMPT: &str = "s1";

/// Wait on a gate if one is installed. The Arc is cloned out first so the
/// lock is never held across the await.
async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
    let gate = gate.lock().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
}

fn install(slot: &Mutex<Option<Arc<Notify>>>) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    *slot.lock() = Some(Arc::clone(&gate));
    gate
}

#[derive(Default)]
pub struct FakeBackend {
    listings: Mutex<HashMap<ContextId, Result<Vec<ConversationSummary>, BackendError>>>,
    details: Mutex<HashMap<String, Result<ConversationDetail, BackendError>>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
    list_calls: AtomicUsize,
    deleted: Mutex<Vec<(String, ContextId)>>,
    delete_error: Mutex<Option<BackendError>>,
}

impl FakeBackend {
    pub fn set_listing(
        &self,
        context: ContextId,
        listing: Result<Vec<ConversationSummary>, BackendError>,
    ) {
        self.listings.lock().insert(context, listing);
    }

    pub fn set_detail(&self, id: &str, detail: Result<ConversationDetail, BackendError>) {
        self.details.lock().insert(id.to_string(), detail);
    }

    /// Hold every listing fetch until the returned gate is notified
    pub fn gate_listings(&self) -> Arc<Notify> {
        install(&self.list_gate)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<(String, ContextId)> {
        self.deleted.lock().clone()
    }

    pub fn fail_deletes(&self, err: BackendError) {
        *self.delete_error.lock() = Some(err);
    }
}

#[async_trait]
impl ConversationBackend for FakeBackend {
    async fn list_conversations(
        &self,
        context: &ContextId,
    ) -> Result<Vec<ConversationSummary>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        pass(&self.list_gate).await;
        self.listings
            .lock()
            .get(context)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn load_conversation_detail(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationDetail, BackendError> {
        self.details
            .lock()
            .get(conversation_id)
            .cloned()
            .unwrap_or_else(|| Err(BackendError::NotFound(conversation_id.to_string())))
    }

    async fn delete_conversation(
        &self,
        conversation_id: &str,
        context: &ContextId,
    ) -> Result<(), BackendError> {
        if let Some(err) = self.delete_error.lock().clone() {
            return Err(err);
        }
        self.deleted
            .lock()
            .push((conversation_id.to_string(), context.clone()));
        Ok(())
    }
}

/// Provider answering from a script, recording every request it receives
pub struct ScriptedProvider {
    key: String,
    responses: Mutex<VecDeque<Result<SendTurnResponse, BackendError>>>,
    requests: Mutex<Vec<SendTurnRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedProvider {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn push(&self, response: Result<SendTurnResponse, BackendError>) {
        self.responses.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<SendTurnRequest> {
        self.requests.lock().clone()
    }

    /// Hold every send until the returned gate is notified
    pub fn gate(&self) -> Arc<Notify> {
        install(&self.gate)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn key(&self) -> &str {
        &self.key
    }

    async fn send(&self, request: &SendTurnRequest) -> Result<SendTurnResponse, BackendError> {
        self.requests.lock().push(request.clone());
        pass(&self.gate).await;
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Provider("no scripted response".into())))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        Ok(vec![ModelInfo {
            id: format!("{}-large", self.key),
            display_name: None,
            context_window: Some(200_000),
        }])
    }
}

#[derive(Debug, Default)]
pub struct CountingNavigator {
    calls: AtomicUsize,
}

impl CountingNavigator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReauthNavigator for CountingNavigator {
    fn request_reauthentication(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend answer carrying one assistant turn
pub fn reply(conversation_id: &str, assistant_id: &str, content: &str) -> SendTurnResponse {
    SendTurnResponse {
        conversation_id: conversation_id.to_string(),
        user_turn_id: None,
        turn: Turn::durable(assistant_id, conversation_id, Role::Assistant, content),
    }
}

/// Durable thread alternating user and assistant turns
pub fn thread(conversation_id: &str, ids: &[&str]) -> Vec<Turn> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            Turn::durable(*id, conversation_id, role, *id)
        })
        .collect()
}

/// Cache a conversation as already opened with the given turns
pub fn seed(state: &AppState, conversation_id: &str, context: ContextId, ids: &[&str]) {
    state.update(|data| {
        data.contexts
            .upsert(ConversationSummary::new(conversation_id, context, conversation_id));
        data.messages
            .replace(&ConversationKey::durable(conversation_id), thread(conversation_id, ids));
        data.session
            .activate(Some(ConversationKey::durable(conversation_id)));
    });
}

pub struct Harness {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub backend: Arc<FakeBackend>,
    pub provider: Arc<ScriptedProvider>,
    pub queue: Arc<MemoryQueue>,
    pub navigator: Arc<CountingNavigator>,
}

impl Harness {
    pub fn state(&self) -> &AppState {
        self.orchestrator.state()
    }
}

pub fn settings() -> SessionConfig {
    SessionConfig {
        default_provider: PROVIDER.to_string(),
        default_prompt: PROMPT.to_string(),
        ..SessionConfig::default()
    }
}

pub fn harness() -> Harness {
    let backend = Arc::new(FakeBackend::default());
    let provider = Arc::new(ScriptedProvider::new(PROVIDER));
    let queue = Arc::new(MemoryQueue::new());
    let navigator = Arc::new(CountingNavigator::default());

    let orchestrator = SessionOrchestrator::new(
        AppState::new(ContextId::Personal),
        backend.clone(),
        ProviderRegistry::new().with(provider.clone()),
        queue.clone(),
        navigator.clone(),
        settings(),
    );

    Harness {
        orchestrator: Arc::new(orchestrator),
        backend,
        provider,
        queue,
        navigator,
    }
}
