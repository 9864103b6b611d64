use crate::backend::SendTurnRequest;
use crate::cache::{ContextId, ContextRegistry};
use crate::recovery::PendingSendDescriptor;
use crate::session::{ConversationKey, RewindMarker, SessionState, Turn};

/// What the user typed and which provider/prompt should answer it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendDraft {
    pub content: String,
    pub provider_id: String,
    pub prompt_id: String,
}

impl SendDraft {
    pub fn new(
        content: impl Into<String>,
        provider_id: impl Into<String>,
        prompt_id: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            provider_id: provider_id.into(),
            prompt_id: prompt_id.into(),
        }
    }
}

/// Conversation a send lands in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    Existing {
        conversation_id: String,
        context: ContextId,
    },
    /// A new conversation attributed to `context`
    New { context: ContextId },
}

impl SendTarget {
    pub fn context(&self) -> &ContextId {
        match self {
            Self::Existing { context, .. } | Self::New { context } => context,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Self::Existing {
                conversation_id, ..
            } => Some(conversation_id),
            Self::New { .. } => None,
        }
    }
}

/// A fully resolved send, independent of the session it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSend {
    pub content: String,
    pub provider_id: String,
    pub prompt_id: String,
    pub target: SendTarget,
    pub rewind: Option<RewindMarker>,
}

impl PreparedSend {
    /// Resolve the target from the session: the active durable conversation,
    /// or a new one in the selected context.
    pub fn resolve(draft: SendDraft, session: &SessionState, contexts: &ContextRegistry) -> Self {
        let target = match &session.active_conversation {
            Some(ConversationKey::Durable(id)) => SendTarget::Existing {
                conversation_id: id.clone(),
                context: contexts
                    .find(id)
                    .map(|summary| summary.context_id.clone())
                    .unwrap_or_else(|| session.selected_context.clone()),
            },
            Some(ConversationKey::Provisional(_)) | None => SendTarget::New {
                context: session.selected_context.clone(),
            },
        };

        let rewind = session
            .rewind_marker
            .clone()
            .filter(|marker| target.conversation_id() == Some(marker.conversation_id.as_str()));

        Self {
            content: draft.content,
            provider_id: draft.provider_id,
            prompt_id: draft.prompt_id,
            target,
            rewind,
        }
    }

    /// Thread the optimistic turn is staged on; new conversations get a fresh
    /// provisional key.
    pub fn staging_key(&self) -> ConversationKey {
        match &self.target {
            SendTarget::Existing {
                conversation_id, ..
            } => ConversationKey::durable(conversation_id.clone()),
            SendTarget::New { .. } => ConversationKey::provisional(),
        }
    }

    pub fn to_request(&self) -> SendTurnRequest {
        SendTurnRequest {
            content: self.content.clone(),
            conversation_id: self.target.conversation_id().map(str::to_string),
            context_id: match &self.target {
                SendTarget::New { context } => Some(context.clone()),
                SendTarget::Existing { .. } => None,
            },
            provider_id: self.provider_id.clone(),
            prompt_id: self.prompt_id.clone(),
            rewind_from_turn_id: self.rewind.as_ref().map(|marker| marker.turn_id.clone()),
        }
    }

    pub fn to_descriptor(&self) -> PendingSendDescriptor {
        PendingSendDescriptor::new(
            self.content.clone(),
            self.target.conversation_id().map(str::to_string),
            self.target.context().clone(),
            self.provider_id.clone(),
            self.prompt_id.clone(),
            self.rewind.clone(),
        )
    }
}

impl From<PendingSendDescriptor> for PreparedSend {
    fn from(descriptor: PendingSendDescriptor) -> Self {
        let target = match descriptor.conversation_id {
            Some(conversation_id) => SendTarget::Existing {
                conversation_id,
                context: descriptor.context_id,
            },
            None => SendTarget::New {
                context: descriptor.context_id,
            },
        };

        Self {
            content: descriptor.content,
            provider_id: descriptor.provider_id,
            prompt_id: descriptor.prompt_id,
            target,
            rewind: descriptor.rewind_marker,
        }
    }
}

/// Result of a send that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Durable id of the conversation the turn landed in
    pub conversation_id: String,
    /// The send created this conversation
    pub created: bool,
    pub assistant_turn: Turn,
    /// Turns removed by a rewind
    pub discarded: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Delivered(Delivery),
    /// Interrupted by an expired session; saved for replay after sign-in
    Deferred,
}

impl SendOutcome {
    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            Self::Delivered(delivery) => Some(delivery),
            Self::Deferred => None,
        }
    }
}
