use crate::app::{AppState, SessionData};
use crate::session::{ConversationKey, TurnId};

/// Optimistic user turn awaiting the backend's answer
#[derive(Debug, Clone)]
pub(crate) struct StagedTurn {
    pub key: ConversationKey,
    pub turn_id: TurnId,
    /// Active conversation before the send began
    pub prior_active: Option<ConversationKey>,
}

impl StagedTurn {
    /// Undo the optimistic append: as if the send had never been attempted
    pub fn roll_back(&self, data: &mut SessionData) {
        data.messages.remove_turn(&self.key, &self.turn_id);
        if self.key.is_provisional() {
            data.messages.discard(&self.key);
        }
        if data.session.active_conversation.as_ref() == Some(&self.key) {
            data.session.active_conversation = self.prior_active.clone();
        }
    }
}

/// Holds the session's single in-flight send slot.
///
/// Dropping the guard releases the slot and rolls back any staged turn that
/// was never settled, so an abandoned send future still leaves the session
/// idle and consistent.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    state: AppState,
    staged: Option<StagedTurn>,
}

impl InFlightGuard {
    /// Claim the slot, or `None` if a send is already outstanding
    pub fn acquire(state: &AppState) -> Option<Self> {
        state
            .update(|data| data.session.try_begin_send())
            .then(|| Self {
                state: state.clone(),
                staged: None,
            })
    }

    pub fn stage(&mut self, staged: StagedTurn) {
        self.staged = Some(staged);
    }

    /// The send resolved successfully; nothing to roll back
    pub fn settle(&mut self) -> Option<StagedTurn> {
        self.staged.take()
    }

    pub fn roll_back(&mut self) {
        if let Some(staged) = self.staged.take() {
            self.state.update(|data| staged.roll_back(data));
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let staged = self.staged.take();
        self.state.update(|data| {
            if let Some(staged) = staged {
                staged.roll_back(data);
            }
            data.session.finish_send();
        });
    }
}
