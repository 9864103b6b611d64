use serde::{Deserialize, Serialize};
use std::fmt;

use super::conversation::{ConversationKey, TurnId};
use crate::cache::ContextId;

/// Turn from which the active conversation is being replayed with new content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewindMarker {
    pub conversation_id: String,
    /// Always durable; provisional turns cannot be rewound to
    pub turn_id: String,
}

impl RewindMarker {
    pub fn turn(&self) -> TurnId {
        TurnId::durable(self.turn_id.clone())
    }
}

/// Where a send attempt currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendStatus {
    #[default]
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    Provider,
    Network,
    Storage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Provider => "provider",
            Self::Network => "network",
            Self::Storage => "storage",
        };
        f.write_str(label)
    }
}

/// User-visible record of the last failed send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Per-session selection and send state
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Thread currently shown; provisional only while a first send is staged
    pub active_conversation: Option<ConversationKey>,
    /// Context new conversations are attributed to
    pub selected_context: ContextId,
    pub rewind_marker: Option<RewindMarker>,
    pub last_error: Option<SendFailure>,
    pub status: SendStatus,
}

impl SessionState {
    pub fn new(selected_context: ContextId) -> Self {
        Self {
            selected_context,
            ..Self::default()
        }
    }

    pub fn is_sending(&self) -> bool {
        self.status == SendStatus::Sending
    }

    /// Claim the single in-flight slot. Returns false if a send is outstanding.
    pub fn try_begin_send(&mut self) -> bool {
        if self.is_sending() {
            return false;
        }
        self.status = SendStatus::Sending;
        true
    }

    pub fn finish_send(&mut self) {
        self.status = SendStatus::Idle;
    }

    /// Point the session at a different thread. A rewind marker never survives
    /// a change of conversation.
    pub fn activate(&mut self, key: Option<ConversationKey>) {
        if self.active_conversation != key {
            self.rewind_marker = None;
        }
        self.active_conversation = key;
    }
}
