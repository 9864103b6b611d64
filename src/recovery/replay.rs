use std::sync::Arc;
use tracing::info;

use crate::runtime::{PreparedSend, SendOutcome, SessionOrchestrator};
use crate::utils::{SendError, StorageError};

/// Replays a send that was interrupted by an expired session
pub struct AuthRecovery {
    orchestrator: Arc<SessionOrchestrator>,
}

impl AuthRecovery {
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn has_pending_send(&self) -> Result<bool, StorageError> {
        Ok(self.orchestrator.queue().peek().await?.is_some())
    }

    /// Call once re-authentication succeeds.
    ///
    /// The descriptor is removed before the send is reissued, so it is
    /// replayed at most once; a failed replay surfaces as an ordinary send
    /// error and is not re-queued.
    pub async fn replay_pending_send_if_any(&self) -> Result<Option<SendOutcome>, SendError> {
        // Claim the send slot first so a busy session never consumes the descriptor
        let guard = self.orchestrator.begin_send()?;

        let Some(descriptor) = self.orchestrator.queue().take().await? else {
            return Ok(None);
        };
        info!(
            conversation = descriptor.conversation_id.as_deref().unwrap_or("<new>"),
            "replaying pending send"
        );

        self.orchestrator
            .dispatch(guard, PreparedSend::from(descriptor))
            .await
            .map(Some)
    }
}
