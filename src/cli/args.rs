use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Multi-provider chat client with rewind and sign-in recovery", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Provider and prompt overrides shared by sending commands
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Provider to answer with (defaults to the last one used)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Prompt id to answer with
    #[arg(long)]
    pub prompt: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// List conversations in the personal or an organization context
    List {
        /// Organization id; personal when omitted
        #[arg(long)]
        org: Option<String>,

        /// Refetch even if cached
        #[arg(long)]
        refresh: bool,
    },
    /// Open a conversation and print its turns
    Open { id: String },
    /// Send a message to the active conversation
    Send {
        message: String,

        #[command(flatten)]
        provider: ProviderArgs,

        /// Start the new conversation in this organization
        #[arg(long, requires = "new")]
        org: Option<String>,

        /// Start a new conversation instead of continuing the active one
        #[arg(long)]
        new: bool,
    },
    /// Replace every turn from TURN onward with a new message
    Rewind {
        turn: String,
        message: String,

        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Delete a conversation
    Delete { id: String },
    /// Send the message saved when the session expired
    Replay,
    /// List the models a provider offers
    Models { provider: Option<String> },
    /// Show version information
    Version,
}
