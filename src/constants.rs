/// Constants module to avoid magic numbers in the codebase

pub const APP_NAME: &str = "parley";

// Network Configuration
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8787";
pub const DEFAULT_TOKEN_ENV: &str = "PARLEY_TOKEN";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120; // generation can be slow

// Conversations
pub const DEFAULT_TITLE_PREFIX_CHARS: usize = 60;
pub const DEFAULT_PROVIDER_ID: &str = "anthropic";
pub const DEFAULT_PROMPT_ID: &str = "default";
pub const DEFAULT_PROVIDERS: &[&str] = &["anthropic", "openai"];

// Pending-send storage
pub const PENDING_SEND_FILE: &str = "pending_send.json";
pub const PENDING_SEND_SCHEMA_VERSION: u32 = 1;

// Config
pub const CONFIG_ENV_PREFIX: &str = "PARLEY_";
pub const LOCAL_CONFIG_PATH: &str = ".parley/config.toml";
