//! Read-only queries over [`SessionData`], for use with [`AppState::read`].
//!
//! [`AppState::read`]: crate::app::AppState::read

use crate::app::SessionData;
use crate::cache::ContextId;
use crate::session::{ConversationKey, ConversationSummary, RewindMarker, SendFailure, Turn};

pub fn active_conversation_id(data: &SessionData) -> Option<&ConversationKey> {
    data.session.active_conversation.as_ref()
}

/// Active conversation's backend id; `None` while a first send is staged
pub fn active_durable_id(data: &SessionData) -> Option<&str> {
    active_conversation_id(data).and_then(ConversationKey::as_durable)
}

pub fn thread<'a>(data: &'a SessionData, key: &ConversationKey) -> &'a [Turn] {
    data.messages.turns(key)
}

/// Turns of the active conversation that should be rendered
pub fn active_turns(data: &SessionData) -> Vec<&Turn> {
    active_conversation_id(data)
        .map(|key| thread(data, key).iter().filter(|turn| turn.active).collect())
        .unwrap_or_default()
}

pub fn conversations_in<'a>(data: &'a SessionData, context: &ContextId) -> &'a [ConversationSummary] {
    data.contexts.conversations(context)
}

pub fn selected_context(data: &SessionData) -> &ContextId {
    &data.session.selected_context
}

pub fn is_context_loading(data: &SessionData, context: &ContextId) -> bool {
    data.contexts.is_loading(context)
}

pub fn context_error<'a>(data: &'a SessionData, context: &ContextId) -> Option<&'a str> {
    data.contexts.error(context)
}

pub fn is_conversation_loading(data: &SessionData, key: &ConversationKey) -> bool {
    data.messages.is_loading(key)
}

pub fn conversation_error<'a>(data: &'a SessionData, key: &ConversationKey) -> Option<&'a str> {
    data.messages.error(key)
}

pub fn send_error(data: &SessionData) -> Option<&SendFailure> {
    data.session.last_error.as_ref()
}

pub fn is_sending(data: &SessionData) -> bool {
    data.session.is_sending()
}

/// A send would be accepted right now
pub fn can_send(data: &SessionData) -> bool {
    !is_sending(data)
}

pub fn rewind_marker(data: &SessionData) -> Option<&RewindMarker> {
    data.session.rewind_marker.as_ref()
}

pub fn active_summary(data: &SessionData) -> Option<&ConversationSummary> {
    active_durable_id(data).and_then(|id| data.contexts.find(id))
}

/// Turns a send from the current rewind marker would discard
pub fn turns_after_marker(data: &SessionData) -> Vec<&Turn> {
    let Some(marker) = rewind_marker(data) else {
        return Vec::new();
    };
    let marker_turn = marker.turn();
    let turns = thread(data, &ConversationKey::durable(marker.conversation_id.clone()));

    turns
        .iter()
        .position(|turn| turn.id == marker_turn)
        .map(|cut| turns[cut..].iter().collect())
        .unwrap_or_default()
}

/// The active thread holds an optimistic turn awaiting the backend
pub fn has_pending_turn(data: &SessionData) -> bool {
    active_conversation_id(data)
        .map(|key| thread(data, key).iter().any(|turn| turn.id.is_provisional()))
        .unwrap_or(false)
}
