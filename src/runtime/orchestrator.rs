use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::guard::{InFlightGuard, StagedTurn};
use super::request::{Delivery, PreparedSend, SendDraft, SendOutcome};
use crate::app::{AppState, SessionConfig};
use crate::backend::{ConversationBackend, ConversationDetail, ModelInfo, SendTurnResponse};
use crate::cache::{ContextId, LoadTicket};
use crate::models::ProviderRegistry;
use crate::recovery::{PendingSendQueue, ReauthNavigator};
use crate::session::{
    derive_title, ConversationKey, ConversationSummary, RewindMarker, SendFailure, Turn, TurnId,
};
use crate::utils::{BackendError, SendError, SessionError};

/// Result of asking for a context's conversation listing
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    /// Served from cache without a fetch
    Cached(Vec<ConversationSummary>),
    /// Fetched now and merged into the cache
    Fetched(Vec<ConversationSummary>),
    /// Another caller's fetch for this context is still outstanding
    InFlight,
}

impl Listing {
    pub fn conversations(&self) -> &[ConversationSummary] {
        match self {
            Self::Cached(list) | Self::Fetched(list) => list,
            Self::InFlight => &[],
        }
    }
}

/// Drives sends, rewinds, and loads against the shared session state
pub struct SessionOrchestrator {
    state: AppState,
    backend: Arc<dyn ConversationBackend>,
    providers: ProviderRegistry,
    queue: Arc<dyn PendingSendQueue>,
    navigator: Arc<dyn ReauthNavigator>,
    settings: SessionConfig,
}

impl SessionOrchestrator {
    pub fn new(
        state: AppState,
        backend: Arc<dyn ConversationBackend>,
        providers: ProviderRegistry,
        queue: Arc<dyn PendingSendQueue>,
        navigator: Arc<dyn ReauthNavigator>,
        settings: SessionConfig,
    ) -> Self {
        Self {
            state,
            backend,
            providers,
            queue,
            navigator,
            settings,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn queue(&self) -> Arc<dyn PendingSendQueue> {
        Arc::clone(&self.queue)
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Context new conversations will be attributed to
    pub fn select_context(&self, context: ContextId) {
        debug!(%context, "context selected");
        self.state.update(|data| data.session.selected_context = context);
    }

    /// Leave the active conversation; the next send creates a new one
    pub fn start_new_conversation(&self) {
        self.state.update(|data| data.session.activate(None));
    }

    /// Make a conversation active and load its turns
    pub async fn open_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationDetail, SessionError> {
        self.state.update(|data| {
            data.session
                .activate(Some(ConversationKey::durable(conversation_id)))
        });
        self.load_conversation(conversation_id).await
    }

    /// Cached listing if present, otherwise fetch it. Never issues a second
    /// fetch for a context whose fetch is outstanding.
    pub async fn list_conversations(&self, context: &ContextId) -> Result<Listing, SessionError> {
        self.load_listing(context, false).await
    }

    /// Refetch a listing even if cached; results are merged by id
    pub async fn refresh_conversations(
        &self,
        context: &ContextId,
    ) -> Result<Listing, SessionError> {
        self.load_listing(context, true).await
    }

    async fn load_listing(&self, context: &ContextId, force: bool) -> Result<Listing, SessionError> {
        match self.state.update(|data| data.contexts.begin_load(context, force)) {
            LoadTicket::Cached(list) => return Ok(Listing::Cached(list)),
            LoadTicket::AlreadyLoading => {
                debug!(%context, "listing fetch already outstanding");
                return Ok(Listing::InFlight);
            }
            LoadTicket::Start => {}
        }

        match self.backend.list_conversations(context).await {
            Ok(fetched) => {
                let count = fetched.len();
                // Keyed by the requested context even if the user moved on
                let merged = self.state.update(|data| {
                    data.contexts.complete_load(context, fetched);
                    data.contexts.conversations(context).to_vec()
                });
                info!(%context, count, "conversations listed");
                Ok(Listing::Fetched(merged))
            }
            Err(err) => {
                warn!(%context, error = %err, "listing fetch failed");
                self.state
                    .update(|data| data.contexts.fail_load(context, err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Fetch a conversation's metadata and active turns together and replace
    /// the cached thread wholesale. A failure keeps what was loaded before.
    pub async fn load_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationDetail, SessionError> {
        let key = ConversationKey::durable(conversation_id);
        self.state.update(|data| data.messages.begin_load(&key));

        match self.backend.load_conversation_detail(conversation_id).await {
            Ok(detail) => {
                self.state.update(|data| {
                    data.contexts.upsert(detail.conversation.clone());
                    data.messages.replace(&key, detail.turns.clone());
                });
                info!(conversation = conversation_id, turns = detail.turns.len(), "conversation loaded");
                Ok(detail)
            }
            Err(err) => {
                warn!(conversation = conversation_id, error = %err, "conversation load failed");
                self.state
                    .update(|data| data.messages.fail_load(&key, err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Delete on the backend, then drop the conversation from every cache
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), SessionError> {
        let context = self
            .state
            .read(|data| {
                data.contexts
                    .find(conversation_id)
                    .map(|summary| summary.context_id.clone())
            })
            .ok_or_else(|| SessionError::UnknownConversation(conversation_id.to_string()))?;

        self.backend
            .delete_conversation(conversation_id, &context)
            .await?;

        let key = ConversationKey::durable(conversation_id);
        self.state.update(|data| {
            data.contexts.remove(conversation_id);
            data.messages.discard(&key);
            if data.session.active_conversation.as_ref() == Some(&key) {
                data.session.activate(None);
            }
        });
        info!(conversation = conversation_id, %context, "conversation deleted");
        Ok(())
    }

    pub async fn list_models(&self, provider_id: &str) -> Result<Vec<ModelInfo>, SessionError> {
        let provider = self
            .providers
            .resolve(provider_id)
            .ok_or_else(|| SessionError::UnknownProvider(provider_id.to_string()))?;
        Ok(provider.list_models().await?)
    }

    /// Mark a durable, active turn of the active conversation as the point the
    /// next send replays from
    pub fn set_rewind_marker(&self, turn_id: &str) -> Result<RewindMarker, SessionError> {
        let invalid = |reason: &str| SessionError::InvalidRewindMarker {
            turn: turn_id.to_string(),
            reason: reason.to_string(),
        };

        self.state.update(|data| {
            if data.session.is_sending() {
                return Err(invalid("a send is in flight"));
            }
            let Some(ConversationKey::Durable(conversation_id)) =
                data.session.active_conversation.clone()
            else {
                return Err(invalid("no saved conversation is active"));
            };

            let key = ConversationKey::durable(conversation_id.clone());
            let turn = data
                .messages
                .turns(&key)
                .iter()
                .find(|turn| turn.id.as_durable() == Some(turn_id));

            match turn {
                None => Err(invalid("turn is not in the active conversation")),
                Some(turn) if !turn.active => Err(invalid("turn is no longer in the thread")),
                Some(_) => {
                    let marker = RewindMarker {
                        conversation_id,
                        turn_id: turn_id.to_string(),
                    };
                    data.session.rewind_marker = Some(marker.clone());
                    Ok(marker)
                }
            }
        })
    }

    pub fn clear_rewind_marker(&self) {
        self.state.update(|data| data.session.rewind_marker = None);
    }

    pub fn dismiss_error(&self) {
        self.state.update(|data| data.session.last_error = None);
    }

    /// Send a message to the active conversation, or start a new one.
    ///
    /// Rejected with [`SendError::InFlight`] while another send is outstanding.
    /// Every other failure rolls the optimistic turn back; all but an expired
    /// session are recorded in the session's error field.
    pub async fn send(&self, draft: SendDraft) -> Result<SendOutcome, SendError> {
        let guard = self.begin_send()?;
        let prepared = self.state.read(|data| {
            PreparedSend::resolve(draft, &data.session, &data.contexts)
        });
        self.dispatch(guard, prepared).await
    }

    /// Set the rewind marker and resubmit from it in one step
    pub async fn rewind_and_resubmit(
        &self,
        turn_id: &str,
        draft: SendDraft,
    ) -> Result<SendOutcome, SendError> {
        if let Err(err) = self.set_rewind_marker(turn_id) {
            return Err(self.record_failure(SendError::Validation(err.to_string())));
        }
        self.send(draft).await
    }

    /// Save a rewind for replay when the session expired before the thread
    /// could be loaded. The turn is checked by the backend once replayed.
    pub async fn defer_rewind(
        &self,
        turn_id: &str,
        draft: SendDraft,
    ) -> Result<SendOutcome, SendError> {
        let guard = self.begin_send()?;
        let mut prepared = self.state.read(|data| {
            PreparedSend::resolve(draft, &data.session, &data.contexts)
        });

        let Some(conversation_id) = prepared.target.conversation_id().map(str::to_string) else {
            return Err(self.record_failure(SendError::Validation(
                "No saved conversation is active".into(),
            )));
        };
        if prepared.content.trim().is_empty() {
            return Err(self.record_failure(SendError::Validation("Message is empty".into())));
        }
        prepared.rewind = Some(RewindMarker {
            conversation_id,
            turn_id: turn_id.to_string(),
        });

        self.defer(guard, &prepared).await
    }

    pub(crate) fn begin_send(&self) -> Result<InFlightGuard, SendError> {
        InFlightGuard::acquire(&self.state).ok_or_else(|| {
            debug!("send rejected: another send is in flight");
            SendError::InFlight
        })
    }

    /// Run one send attempt to resolution. The guard is held throughout.
    pub(crate) async fn dispatch(
        &self,
        mut guard: InFlightGuard,
        prepared: PreparedSend,
    ) -> Result<SendOutcome, SendError> {
        if prepared.content.trim().is_empty() {
            return Err(self.record_failure(SendError::Validation("Message is empty".into())));
        }
        let Some(provider) = self.providers.resolve(&prepared.provider_id) else {
            return Err(self.record_failure(SendError::Validation(format!(
                "Unknown provider: {}",
                prepared.provider_id
            ))));
        };

        let request = prepared.to_request();
        let staging = prepared.staging_key();
        let user_turn = Turn::provisional_user(
            staging.clone(),
            prepared.content.clone(),
            self.settings.user_id.clone(),
            prepared.provider_id.clone(),
            prepared.prompt_id.clone(),
        );
        let user_turn_id = user_turn.id.clone();

        // Optimistic append always precedes the network call
        let prior_active = self.state.update(|data| {
            let prior = data.session.active_conversation.clone();
            data.messages.append(&staging, user_turn);
            data.session.active_conversation = Some(staging.clone());
            data.session.last_error = None;
            prior
        });
        guard.stage(StagedTurn {
            key: staging.clone(),
            turn_id: user_turn_id.clone(),
            prior_active,
        });
        debug!(conversation = %staging, provider = %prepared.provider_id, "send started");

        match provider.send(&request).await {
            Ok(response) => {
                guard.settle();
                Ok(SendOutcome::Delivered(self.reconcile(
                    &prepared,
                    &staging,
                    &user_turn_id,
                    response,
                )))
            }
            Err(BackendError::AuthRequired) => self.defer(guard, &prepared).await,
            Err(err) => {
                guard.roll_back();
                warn!(conversation = %staging, error = %err, "send failed, rolled back");
                Err(self.record_failure(err.into()))
            }
        }
    }

    fn reconcile(
        &self,
        prepared: &PreparedSend,
        staging: &ConversationKey,
        user_turn_id: &TurnId,
        response: SendTurnResponse,
    ) -> Delivery {
        let durable = ConversationKey::durable(response.conversation_id.clone());
        let created = *staging != durable;
        let now = Utc::now();

        let (discarded, assistant_turn) = self.state.update(|data| {
            if created {
                data.messages.rekey(staging, &durable);
                if data.session.active_conversation.as_ref() == Some(staging) {
                    data.session.active_conversation = Some(durable.clone());
                }

                let mut summary = ConversationSummary::new(
                    response.conversation_id.clone(),
                    prepared.target.context().clone(),
                    derive_title(&prepared.content, self.settings.title_prefix_chars),
                );
                summary.default_prompt_id = Some(prepared.prompt_id.clone());
                data.contexts.upsert(summary);
            } else {
                data.contexts.touch(&response.conversation_id, now);
            }

            let discarded = match &prepared.rewind {
                Some(marker) => data
                    .messages
                    .discard_from(&durable, &marker.turn(), user_turn_id)
                    .unwrap_or_else(|| {
                        warn!(turn = %marker.turn_id, "rewind marker not in loaded thread");
                        0
                    }),
                None => 0,
            };

            if let Some(confirmed) = &response.user_turn_id {
                data.messages
                    .confirm_turn(&durable, user_turn_id, TurnId::durable(confirmed.clone()));
            }

            let assistant_turn = Turn {
                conversation: durable.clone(),
                ..response.turn
            };
            data.messages.append(&durable, assistant_turn.clone());

            data.session.rewind_marker = None;
            data.session.last_error = None;
            (discarded, assistant_turn)
        });

        info!(
            conversation = %response.conversation_id,
            created,
            discarded,
            "send delivered"
        );

        Delivery {
            conversation_id: response.conversation_id,
            created,
            assistant_turn,
            discarded,
        }
    }

    /// Expired session: persist the send for replay, roll back, and hand off
    /// to re-authentication. No error is shown unless persisting fails.
    async fn defer(
        &self,
        mut guard: InFlightGuard,
        prepared: &PreparedSend,
    ) -> Result<SendOutcome, SendError> {
        match self.queue.put(prepared.to_descriptor()).await {
            Ok(()) => {
                guard.roll_back();
                info!("send deferred until re-authentication");
                self.navigator.request_reauthentication();
                Ok(SendOutcome::Deferred)
            }
            Err(err) => {
                guard.roll_back();
                error!(error = %err, "could not persist pending send");
                Err(self.record_failure(SendError::Storage(err)))
            }
        }
    }

    fn record_failure(&self, err: SendError) -> SendError {
        if let Some(kind) = err.failure_kind() {
            let failure = SendFailure {
                kind,
                message: err.to_string(),
            };
            self.state
                .update(|data| data.session.last_error = Some(failure));
        }
        err
    }
}
