/// Session management module - Gateway

mod conversation;
mod messages;
mod snapshot;
mod state;

pub use conversation::{
    derive_title, ConversationKey, ConversationSummary, Role, TokenUsage, Turn, TurnId,
};
pub use messages::MessageStore;
pub use snapshot::SessionSnapshot;
pub use state::{FailureKind, RewindMarker, SendFailure, SendStatus, SessionState};
