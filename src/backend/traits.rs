use async_trait::async_trait;

use super::types::ConversationDetail;
use crate::cache::ContextId;
use crate::session::ConversationSummary;
use crate::utils::BackendError;

/// Durable conversation store, reached over the network.
///
/// Sends go through a [`crate::models::Provider`] instead, resolved per request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Summaries of every conversation in a context
    async fn list_conversations(
        &self,
        context: &ContextId,
    ) -> Result<Vec<ConversationSummary>, BackendError>;

    /// Metadata and active turns of one conversation in a single round trip
    async fn load_conversation_detail(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationDetail, BackendError>;

    async fn delete_conversation(
        &self,
        conversation_id: &str,
        context: &ContextId,
    ) -> Result<(), BackendError>;
}
