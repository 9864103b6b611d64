use serde::{Deserialize, Serialize};

use crate::cache::ContextId;
use crate::session::{ConversationSummary, Turn};

/// One send as it goes over the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendTurnRequest {
    pub content: String,
    /// Absent when the send creates a new conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Present only when creating a new conversation; `null` is personal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<ContextId>,
    pub provider_id: String,
    pub prompt_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewind_from_turn_id: Option<String>,
}

/// Result of a successful send
#[derive(Debug, Clone, PartialEq)]
pub struct SendTurnResponse {
    /// Conversation the turn was applied to, new or existing
    pub conversation_id: String,
    /// Durable id of the persisted user turn, when the backend reports it
    pub user_turn_id: Option<String>,
    /// Assistant turn produced for the message
    pub turn: Turn,
}

/// Conversation metadata and its active turns, fetched together
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationDetail {
    pub conversation: ConversationSummary,
    pub turns: Vec<Turn>,
}

/// A model offered by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub context_window: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_personal_conversation_request_shape() {
        let request = SendTurnRequest {
            content: "Hello".into(),
            conversation_id: None,
            context_id: Some(ContextId::Personal),
            provider_id: "p1".into(),
            prompt_id: "s1".into(),
            rewind_from_turn_id: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "content": "Hello",
                "context_id": null,
                "provider_id": "p1",
                "prompt_id": "s1",
            })
        );
    }

    #[test]
    fn test_existing_conversation_request_omits_context() {
        let request = SendTurnRequest {
            content: "Retry".into(),
            conversation_id: Some("c1".into()),
            context_id: None,
            provider_id: "p1".into(),
            prompt_id: "s1".into(),
            rewind_from_turn_id: Some("m2".into()),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("context_id").is_none());
        assert_eq!(json["rewind_from_turn_id"], "m2");
    }
}
