use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    APP_NAME, CONFIG_ENV_PREFIX, DEFAULT_BACKEND_URL, DEFAULT_PROMPT_ID, DEFAULT_PROVIDERS,
    DEFAULT_PROVIDER_ID, DEFAULT_TITLE_PREFIX_CHARS, DEFAULT_TOKEN_ENV,
    HTTP_REQUEST_TIMEOUT_SECS, LOCAL_CONFIG_PATH, PENDING_SEND_FILE,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Conversation backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Send and title defaults
    #[serde(default)]
    pub session: SessionConfig,

    /// Provider keys registered at startup
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Pending-send persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the conversation API
    pub url: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Session defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Characters of the first message used as a new conversation's title
    pub title_prefix_chars: usize,
    pub default_provider: String,
    pub default_prompt: String,
    /// Author id stamped on optimistic user turns
    pub user_id: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            title_prefix_chars: DEFAULT_TITLE_PREFIX_CHARS,
            default_provider: DEFAULT_PROVIDER_ID.to_string(),
            default_prompt: DEFAULT_PROMPT_ID.to_string(),
            user_id: None,
        }
    }
}

/// Provider registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub enabled: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Pending-send file; defaults to the platform data directory
    pub pending_send_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_pending_send_path(&self) -> Result<PathBuf> {
        match &self.pending_send_path {
            Some(path) => Ok(path.clone()),
            None => Ok(get_data_dir()?.join(PENDING_SEND_FILE)),
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    load_config_from(&global_config, Path::new(LOCAL_CONFIG_PATH))
}

/// Layer defaults, the global file, the local file, then `PARLEY_` env vars
pub fn load_config_from(global_config: &Path, local_config: &Path) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(local_config));
    }

    // PARLEY_BACKEND__URL -> backend.url
    figment = figment.merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"));

    figment.extract().context("Failed to load configuration")
}

/// Load configuration from an explicit file, still honoring env overrides
pub fn load_config_file(path: &Path) -> Result<Config> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"))
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join(APP_NAME);
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Get the data directory (pending sends live here)
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let data_dir = PathBuf::from(home).join(".local").join("share").join(APP_NAME);
        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
    }

    Ok(config_file)
}
