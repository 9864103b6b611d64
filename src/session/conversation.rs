use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::cache::ContextId;

/// Identifies a thread in the message store.
///
/// `Provisional` keys are minted locally as staging areas for a first send and
/// never leave this process; only `Durable` ids are ever sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ConversationKey {
    Provisional(Uuid),
    Durable(String),
}

impl ConversationKey {
    pub fn provisional() -> Self {
        Self::Provisional(Uuid::new_v4())
    }

    pub fn durable(id: impl Into<String>) -> Self {
        Self::Durable(id.into())
    }

    pub fn as_durable(&self) -> Option<&str> {
        match self {
            Self::Durable(id) => Some(id),
            Self::Provisional(_) => None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisional(id) => write!(f, "provisional:{}", id),
            Self::Durable(id) => write!(f, "{}", id),
        }
    }
}

/// Identifies a turn. Same provisional/durable split as [`ConversationKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TurnId {
    Provisional(Uuid),
    Durable(String),
}

impl TurnId {
    pub fn provisional() -> Self {
        Self::Provisional(Uuid::new_v4())
    }

    pub fn durable(id: impl Into<String>) -> Self {
        Self::Durable(id.into())
    }

    pub fn as_durable(&self) -> Option<&str> {
        match self {
            Self::Durable(id) => Some(id),
            Self::Provisional(_) => None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisional(id) => write!(f, "provisional:{}", id),
            Self::Durable(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// One message exchanged within a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub conversation: ConversationKey,
    pub role: Role,
    pub content: String,
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Only active turns are rendered
    pub active: bool,
    pub usage: Option<TokenUsage>,
    pub provider_id: Option<String>,
    pub prompt_id: Option<String>,
}

impl Turn {
    /// Optimistic user turn staged before the backend has seen it
    pub fn provisional_user(
        conversation: ConversationKey,
        content: impl Into<String>,
        author_id: Option<String>,
        provider_id: impl Into<String>,
        prompt_id: impl Into<String>,
    ) -> Self {
        Self {
            id: TurnId::provisional(),
            conversation,
            role: Role::User,
            content: content.into(),
            author_id,
            created_at: Utc::now(),
            active: true,
            usage: None,
            provider_id: Some(provider_id.into()),
            prompt_id: Some(prompt_id.into()),
        }
    }

    /// Turn as returned by the backend
    pub fn durable(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: TurnId::durable(id),
            conversation: ConversationKey::durable(conversation_id),
            role,
            content: content.into(),
            author_id: None,
            created_at: Utc::now(),
            active: true,
            usage: None,
            provider_id: None,
            prompt_id: None,
        }
    }
}

/// Cached summary of a conversation, as listed per context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Durable id assigned by the backend
    pub id: String,
    pub context_id: ContextId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub default_prompt_id: Option<String>,
}

impl ConversationSummary {
    pub fn new(id: impl Into<String>, context_id: ContextId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            context_id,
            title: title.into(),
            created_at: now,
            updated_at: now,
            default_prompt_id: None,
        }
    }
}

/// Title for a new conversation: the first `max_chars` characters of the
/// first message, whitespace-collapsed.
pub fn derive_title(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect::<String>().trim_end().to_string()
}
