use async_trait::async_trait;
use std::sync::Arc;

use super::traits::Provider;
use crate::backend::{HttpBackend, ModelInfo, SendTurnRequest, SendTurnResponse};
use crate::utils::BackendError;

/// Provider that relays through the conversation backend.
///
/// The backend owns the upstream credentials and routing, so every provider
/// key goes through the same client; only the key differs.
pub struct UnifiedProvider {
    key: String,
    backend: Arc<HttpBackend>,
}

impl UnifiedProvider {
    pub fn new(key: impl Into<String>, backend: Arc<HttpBackend>) -> Self {
        Self {
            key: key.into(),
            backend,
        }
    }
}

#[async_trait]
impl Provider for UnifiedProvider {
    fn key(&self) -> &str {
        &self.key
    }

    async fn send(&self, request: &SendTurnRequest) -> Result<SendTurnResponse, BackendError> {
        if request.provider_id != self.key {
            return Err(BackendError::Validation(format!(
                "Request for provider '{}' routed to '{}'",
                request.provider_id, self.key
            )));
        }
        self.backend.post_turn(request).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError> {
        self.backend.fetch_models(&self.key).await
    }
}
