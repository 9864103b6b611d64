/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;

pub use args::{Cli, Commands, ProviderArgs};
pub use commands::{handle_command, handle_standalone, show_version, CommandContext};
