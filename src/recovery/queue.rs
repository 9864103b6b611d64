use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::descriptor::PendingSendDescriptor;
use crate::utils::StorageError;

/// Holds at most one interrupted send, independent of the storage medium
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PendingSendQueue: Send + Sync {
    /// Persist a descriptor, replacing any previous one
    async fn put(&self, descriptor: PendingSendDescriptor) -> Result<(), StorageError>;

    /// Read the descriptor without removing it
    async fn peek(&self) -> Result<Option<PendingSendDescriptor>, StorageError>;

    /// Remove and return the descriptor
    async fn take(&self) -> Result<Option<PendingSendDescriptor>, StorageError>;
}

/// In-process queue; lost on exit
#[derive(Debug, Default)]
pub struct MemoryQueue {
    slot: Mutex<Option<PendingSendDescriptor>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingSendQueue for MemoryQueue {
    async fn put(&self, descriptor: PendingSendDescriptor) -> Result<(), StorageError> {
        if self.slot.lock().replace(descriptor).is_some() {
            warn!("replaced an unreplayed pending send");
        }
        Ok(())
    }

    async fn peek(&self) -> Result<Option<PendingSendDescriptor>, StorageError> {
        Ok(self.slot.lock().clone())
    }

    async fn take(&self) -> Result<Option<PendingSendDescriptor>, StorageError> {
        Ok(self.slot.lock().take())
    }
}

/// Queue backed by a single JSON file
#[derive(Debug, Clone)]
pub struct FileQueue {
    path: PathBuf,
}

impl FileQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PendingSendQueue for FileQueue {
    async fn put(&self, descriptor: PendingSendDescriptor) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated descriptor
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, descriptor.to_json()?).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!(path = %self.path.display(), "pending send persisted");
        Ok(())
    }

    async fn peek(&self) -> Result<Option<PendingSendDescriptor>, StorageError> {
        match self.read().await? {
            Some(json) => PendingSendDescriptor::from_json(&json).map(Some),
            None => Ok(None),
        }
    }

    async fn take(&self) -> Result<Option<PendingSendDescriptor>, StorageError> {
        let Some(json) = self.read().await? else {
            return Ok(None);
        };

        // Removed before parsing: an unreadable descriptor must not wedge every later replay
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        PendingSendDescriptor::from_json(&json).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContextId;
    use tempfile::TempDir;

    fn descriptor(content: &str) -> PendingSendDescriptor {
        PendingSendDescriptor::new(content, None, ContextId::Personal, "p1", "s1", None)
    }

    #[tokio::test]
    async fn test_memory_queue_holds_one() {
        let queue = MemoryQueue::new();
        queue.put(descriptor("first")).await.unwrap();
        queue.put(descriptor("second")).await.unwrap();

        assert_eq!(queue.peek().await.unwrap().map(|d| d.content), Some("second".into()));
        assert_eq!(queue.take().await.unwrap().map(|d| d.content), Some("second".into()));
        assert!(queue.take().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_queue_put_peek_take() {
        let dir = TempDir::new().unwrap();
        let queue = FileQueue::new(dir.path().join("state").join("pending_send.json"));

        assert!(queue.peek().await.unwrap().is_none());

        let original = descriptor("Hi");
        queue.put(original.clone()).await.unwrap();
        assert!(queue.path().exists());
        assert_eq!(queue.peek().await.unwrap(), Some(original.clone()));

        assert_eq!(queue.take().await.unwrap(), Some(original));
        assert!(!queue.path().exists());
        assert!(queue.take().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_queue_drops_corrupt_descriptor_on_take() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pending_send.json");
        std::fs::write(&path, "{not json").unwrap();
        let queue = FileQueue::new(&path);

        assert!(matches!(queue.take().await, Err(StorageError::Serialization(_))));
        assert!(!path.exists());
    }
}
