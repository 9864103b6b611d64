use async_trait::async_trait;

use crate::backend::{ModelInfo, SendTurnRequest, SendTurnResponse};
use crate::utils::BackendError;

/// Core trait that every generation provider must implement
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry key, e.g. "anthropic"
    fn key(&self) -> &str;

    /// Generate the assistant turn for one user message
    async fn send(&self, request: &SendTurnRequest) -> Result<SendTurnResponse, BackendError>;

    /// Models this provider can generate with
    async fn list_models(&self) -> Result<Vec<ModelInfo>, BackendError>;
}
