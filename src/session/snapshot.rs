use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::get_config_dir;
use crate::cache::ContextId;

/// Selection state that persists between CLI runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub active_conversation: Option<String>,
    /// Organization selected for new conversations; `None` is personal
    pub organization: Option<String>,
    pub last_provider: Option<String>,
    pub last_prompt: Option<String>,
}

impl SessionSnapshot {
    /// Get the path to the session file
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_config_dir()?.join("session.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read session file {}", path.display()))?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write session file {}", path.display()))?;
        Ok(())
    }

    pub fn context(&self) -> ContextId {
        ContextId::from(self.organization.clone())
    }

    pub fn set_context(&mut self, context: &ContextId) {
        self.organization = context.as_org().map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let snapshot = SessionSnapshot::load_from(&dir.path().join("session.toml")).unwrap();
        assert_eq!(snapshot, SessionSnapshot::default());
        assert!(snapshot.context().is_personal());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.toml");

        let mut snapshot = SessionSnapshot {
            active_conversation: Some("c123".into()),
            last_provider: Some("anthropic".into()),
            ..SessionSnapshot::default()
        };
        snapshot.set_context(&ContextId::organization("acme"));
        snapshot.save_to(&path).unwrap();

        let loaded = SessionSnapshot::load_from(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.context().as_org(), Some("acme"));
    }
}
