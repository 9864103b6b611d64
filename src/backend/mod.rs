// Gateway module for the conversation backend collaborator

mod http;
mod traits;
mod types;

pub use http::{classify_status, HttpBackend};
pub use traits::ConversationBackend;
#[cfg(test)]
pub use traits::MockConversationBackend;
pub use types::{ConversationDetail, ModelInfo, SendTurnRequest, SendTurnResponse};
