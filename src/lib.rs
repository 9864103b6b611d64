pub mod app;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod constants;
pub mod models;
pub mod recovery;
pub mod runtime;
pub mod selectors;
pub mod session;
pub mod utils;

pub use app::{load_config, AppState, Config};
pub use models::{Provider, ProviderRegistry};
pub use runtime::{SendDraft, SendOutcome, SessionOrchestrator};
pub use utils::{SendError, SessionError};
