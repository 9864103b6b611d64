use thiserror::Error;

use crate::session::FailureKind;

/// Failures reported by the backend and provider collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Failures of the pending-send queue's storage medium
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Descriptor serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported pending-send descriptor version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Outcome taxonomy of a send attempt
#[derive(Error, Debug)]
pub enum SendError {
    #[error("A send is already in flight")]
    InFlight,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    Network(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Could not save your message for retry after sign-in: {0}")]
    Storage(#[from] StorageError),
}

impl SendError {
    /// Kind recorded in the session's error field, if this error is shown to the user
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Validation(_) => Some(FailureKind::Validation),
            Self::Provider(_) => Some(FailureKind::Provider),
            Self::Network(_) => Some(FailureKind::Network),
            Self::Storage(_) => Some(FailureKind::Storage),
            Self::InFlight | Self::AuthRequired => None,
        }
    }
}

impl From<BackendError> for SendError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::AuthRequired => Self::AuthRequired,
            BackendError::Validation(msg) => Self::Validation(msg),
            BackendError::Provider(msg) => Self::Provider(msg),
            BackendError::Network(msg) => Self::Network(msg),
            BackendError::NotFound(what) => Self::Validation(format!("Not found: {}", what)),
        }
    }
}

/// Failures of the non-send session operations
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    #[error("Cannot rewind to turn {turn}: {reason}")]
    InvalidRewindMarker { turn: String, reason: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}
