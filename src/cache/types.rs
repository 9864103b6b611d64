use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::ConversationSummary;

/// Scope a conversation lives in: the user's personal space or one organization.
///
/// Serializes as `null` for personal and as the organization id otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum ContextId {
    #[default]
    Personal,
    Organization(String),
}

impl ContextId {
    pub fn organization(id: impl Into<String>) -> Self {
        Self::Organization(id.into())
    }

    /// Organization id, or `None` for the personal context
    pub fn as_org(&self) -> Option<&str> {
        match self {
            Self::Personal => None,
            Self::Organization(id) => Some(id),
        }
    }

    pub fn is_personal(&self) -> bool {
        matches!(self, Self::Personal)
    }
}

impl From<Option<String>> for ContextId {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(id) => Self::Organization(id),
            None => Self::Personal,
        }
    }
}

impl From<ContextId> for Option<String> {
    fn from(value: ContextId) -> Self {
        match value {
            ContextId::Personal => None,
            ContextId::Organization(id) => Some(id),
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Organization(id) => write!(f, "org:{}", id),
        }
    }
}

/// Cached state for one context
#[derive(Debug, Clone, Default)]
pub struct ContextEntry {
    /// Conversation summaries in insertion order
    pub conversations: Vec<ConversationSummary>,
    /// A full listing has been fetched at least once
    pub loaded: bool,
    /// A listing fetch is outstanding
    pub loading: bool,
    /// Message of the last failed fetch
    pub error: Option<String>,
}

/// What a caller should do after asking the registry to start a load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadTicket {
    /// The listing is cached; no fetch needed
    Cached(Vec<ConversationSummary>),
    /// Another caller already owns the fetch for this context
    AlreadyLoading,
    /// The caller owns the fetch and must complete or fail it
    Start,
}
