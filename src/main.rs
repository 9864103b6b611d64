use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::debug;

use parley::{
    app::{load_config, load_config_file, AppState, Config},
    backend::HttpBackend,
    cli::{handle_command, handle_standalone, Cli, CommandContext},
    models::ProviderRegistry,
    recovery::{CliNavigator, FileQueue},
    runtime::SessionOrchestrator,
    session::{ConversationKey, SessionSnapshot},
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if handle_standalone(&cli.command)? {
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => load_config().unwrap_or_default(),
    };

    let snapshot_path = SessionSnapshot::default_path()?;
    let snapshot = SessionSnapshot::load_from(&snapshot_path)?;

    let orchestrator = build_orchestrator(&config, &snapshot)?;
    let mut ctx = CommandContext::new(Arc::new(orchestrator), config.session.clone(), snapshot);

    let result = handle_command(&cli.command, &mut ctx).await;

    // Selection survives even a failed command
    ctx.snapshot.save_to(&snapshot_path)?;
    result
}

/// Wire the orchestrator from configuration and the last session
fn build_orchestrator(config: &Config, snapshot: &SessionSnapshot) -> Result<SessionOrchestrator> {
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let providers = ProviderRegistry::from_config(&config.providers, Arc::clone(&backend));
    debug!(?providers, "providers registered");

    let queue = FileQueue::new(config.storage.resolve_pending_send_path()?);
    let navigator = CliNavigator {
        token_env: config.backend.token_env.clone(),
    };

    let state = AppState::new(snapshot.context());
    if let Some(id) = &snapshot.active_conversation {
        state.update(|data| data.session.activate(Some(ConversationKey::durable(id.clone()))));
    }

    Ok(SessionOrchestrator::new(
        state,
        backend,
        providers,
        Arc::new(queue),
        Arc::new(navigator),
        config.session.clone(),
    ))
}
