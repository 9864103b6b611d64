use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

use crate::{
    app::{init_config, SessionConfig},
    cache::ContextId,
    recovery::AuthRecovery,
    runtime::{SendDraft, SendOutcome, SessionOrchestrator},
    selectors,
    session::{ConversationSummary, Role, SessionSnapshot, Turn},
    utils::{BackendError, SessionError},
};

use super::{Commands, ProviderArgs};

/// Everything a session command needs; the snapshot is written back by the caller
pub struct CommandContext {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub recovery: AuthRecovery,
    pub settings: SessionConfig,
    pub snapshot: SessionSnapshot,
}

impl CommandContext {
    pub fn new(
        orchestrator: Arc<SessionOrchestrator>,
        settings: SessionConfig,
        snapshot: SessionSnapshot,
    ) -> Self {
        Self {
            recovery: AuthRecovery::new(Arc::clone(&orchestrator)),
            orchestrator,
            settings,
            snapshot,
        }
    }

    fn draft(&self, message: &str, args: &ProviderArgs) -> SendDraft {
        let provider = args
            .provider
            .clone()
            .or_else(|| self.snapshot.last_provider.clone())
            .unwrap_or_else(|| self.settings.default_provider.clone());
        let prompt = args
            .prompt
            .clone()
            .or_else(|| self.snapshot.last_prompt.clone())
            .unwrap_or_else(|| self.settings.default_prompt.clone());
        SendDraft::new(message, provider, prompt)
    }

    /// Copy the session's selection back into the snapshot
    fn capture(&mut self, draft: Option<&SendDraft>) {
        let (active, context) = self.orchestrator.state().read(|data| {
            (
                selectors::active_durable_id(data).map(str::to_string),
                selectors::selected_context(data).clone(),
            )
        });
        self.snapshot.active_conversation = active;
        self.snapshot.set_context(&context);
        if let Some(draft) = draft {
            self.snapshot.last_provider = Some(draft.provider_id.clone());
            self.snapshot.last_prompt = Some(draft.prompt_id.clone());
        }
    }
}

/// Handle commands that need no session. Returns true if handled.
pub fn handle_standalone(command: &Commands) -> Result<bool> {
    match command {
        Commands::Init => {
            println!("Initializing Parley configuration...");
            let path = init_config()?;
            println!("Configuration written to {}", path.display().to_string().cyan());
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Handle CLI subcommands against a live session
pub async fn handle_command(command: &Commands, ctx: &mut CommandContext) -> Result<()> {
    match command {
        Commands::Init | Commands::Version => {
            handle_standalone(command)?;
        }
        Commands::List { org, refresh } => {
            let context = ContextId::from(org.clone());
            let listing = if *refresh {
                ctx.orchestrator.refresh_conversations(&context).await?
            } else {
                ctx.orchestrator.list_conversations(&context).await?
            };
            print_listing(&context, listing.conversations());
        }
        Commands::Open { id } => {
            ctx.orchestrator.open_conversation(id).await?;
            print_active_thread(&ctx.orchestrator);
            ctx.capture(None);
        }
        Commands::Send {
            message,
            provider,
            org,
            new,
        } => {
            if *new {
                ctx.orchestrator.start_new_conversation();
                ctx.orchestrator
                    .select_context(ContextId::from(org.clone()));
            } else if let Some(id) = ctx.snapshot.active_conversation.clone() {
                // The send classifies its own failures; an expired session is deferred there
                if let Err(err) = ctx.orchestrator.open_conversation(&id).await {
                    warn!(conversation = %id, error = %err, "could not load conversation before send");
                }
            }
            warn_if_pending(ctx).await;

            let draft = ctx.draft(message, provider);
            let outcome = ctx.orchestrator.send(draft.clone()).await;
            ctx.capture(Some(&draft));
            print_outcome(outcome?);
        }
        Commands::Rewind {
            turn,
            message,
            provider,
        } => {
            let id = ctx
                .snapshot
                .active_conversation
                .clone()
                .context("No active conversation; open one first")?;
            let loaded = ctx.orchestrator.open_conversation(&id).await;

            let draft = ctx.draft(message, provider);
            let outcome = match loaded {
                Ok(_) => ctx.orchestrator.rewind_and_resubmit(turn, draft.clone()).await,
                Err(SessionError::Backend(BackendError::AuthRequired)) => {
                    ctx.orchestrator.defer_rewind(turn, draft.clone()).await
                }
                Err(err) => return Err(err.into()),
            };
            ctx.capture(Some(&draft));
            print_outcome(outcome?);
        }
        Commands::Delete { id } => {
            // Loading registers the summary and its owning context
            ctx.orchestrator.load_conversation(id).await?;
            ctx.orchestrator.delete_conversation(id).await?;
            println!("Deleted {}", id.cyan());
            ctx.capture(None);
        }
        Commands::Replay => {
            let pending = ctx.orchestrator.queue().peek().await?;
            let Some(descriptor) = pending else {
                println!("{}", "Nothing to replay.".dimmed());
                return Ok(());
            };
            if let Some(id) = &descriptor.conversation_id {
                if let Err(err) = ctx.orchestrator.open_conversation(id).await {
                    warn!(conversation = %id, error = %err, "could not load conversation before replay");
                }
            }

            let outcome = ctx.recovery.replay_pending_send_if_any().await;
            ctx.capture(None);
            if let Some(outcome) = outcome? {
                print_outcome(outcome);
            }
        }
        Commands::Models { provider } => {
            let provider = provider
                .clone()
                .or_else(|| ctx.snapshot.last_provider.clone())
                .unwrap_or_else(|| ctx.settings.default_provider.clone());
            let models = ctx.orchestrator.list_models(&provider).await?;
            println!("Models offered by {}:", provider.cyan());
            for model in models {
                let name = model.display_name.as_deref().unwrap_or(&model.id);
                match model.context_window {
                    Some(window) => println!("  • {} ({} tokens)", name.green(), window),
                    None => println!("  • {}", name.green()),
                }
            }
        }
    }
    Ok(())
}

async fn warn_if_pending(ctx: &CommandContext) {
    if let Ok(true) = ctx.recovery.has_pending_send().await {
        eprintln!(
            "{} a message saved before your session expired is waiting; run {}",
            "note:".yellow(),
            "parley replay".green()
        );
    }
}

fn print_listing(context: &ContextId, conversations: &[ConversationSummary]) {
    println!("Conversations ({}):", context.to_string().cyan());
    if conversations.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for summary in conversations {
        println!(
            "  {}  {}  {}",
            summary.id.cyan(),
            summary.title,
            summary.updated_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
}

fn print_turn(turn: &Turn) {
    let label = match turn.role {
        Role::User => "you".blue().bold(),
        Role::Assistant => "assistant".green().bold(),
        Role::System => "system".yellow().bold(),
    };
    println!("{} {}", label, format!("[{}]", turn.id).dimmed());
    println!("{}\n", turn.content);
}

fn print_active_thread(orchestrator: &SessionOrchestrator) {
    let turns: Vec<Turn> = orchestrator.state().read(|data| {
        selectors::active_turns(data).into_iter().cloned().collect()
    });
    for turn in &turns {
        print_turn(turn);
    }
}

fn print_outcome(outcome: SendOutcome) {
    match outcome {
        SendOutcome::Delivered(delivery) => {
            if delivery.created {
                println!("Started conversation {}", delivery.conversation_id.cyan());
            }
            if delivery.discarded > 0 {
                println!("{}", format!("Rewound {} turn(s)", delivery.discarded).dimmed());
            }
            print_turn(&delivery.assistant_turn);
        }
        // The navigator has already told the user what to do
        SendOutcome::Deferred => {}
    }
}

/// Show version information
pub fn show_version() {
    println!("Parley v{}", env!("CARGO_PKG_VERSION"));
    println!("   Multi-provider chat client");
}
