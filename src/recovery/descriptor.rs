use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::ContextId;
use crate::constants::PENDING_SEND_SCHEMA_VERSION;
use crate::session::RewindMarker;
use crate::utils::StorageError;

/// Snapshot of one send interrupted by an authentication failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSendDescriptor {
    pub version: u32,
    pub content: String,
    /// `None` when the send would have created a new conversation
    pub conversation_id: Option<String>,
    /// Context the send targets; `null` is personal
    pub context_id: ContextId,
    pub provider_id: String,
    pub prompt_id: String,
    pub rewind_marker: Option<RewindMarker>,
    pub created_at: DateTime<Utc>,
}

impl PendingSendDescriptor {
    pub fn new(
        content: impl Into<String>,
        conversation_id: Option<String>,
        context_id: ContextId,
        provider_id: impl Into<String>,
        prompt_id: impl Into<String>,
        rewind_marker: Option<RewindMarker>,
    ) -> Self {
        Self {
            version: PENDING_SEND_SCHEMA_VERSION,
            content: content.into(),
            conversation_id,
            context_id,
            provider_id: provider_id.into(),
            prompt_id: prompt_id.into(),
            rewind_marker,
            created_at: Utc::now(),
        }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and reject any schema version other than the current one
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        let descriptor: Self = serde_json::from_str(json)?;
        if descriptor.version != PENDING_SEND_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: descriptor.version,
                expected: PENDING_SEND_SCHEMA_VERSION,
            });
        }
        Ok(descriptor)
    }
}
