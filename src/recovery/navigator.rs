use colored::Colorize;

/// Sends the user to credential renewal after a send hits an expired session
#[cfg_attr(test, mockall::automock)]
pub trait ReauthNavigator: Send + Sync {
    fn request_reauthentication(&self);
}

/// Terminal navigator: tells the user how to sign in again and resume
#[derive(Debug, Default)]
pub struct CliNavigator {
    pub token_env: String,
}

impl ReauthNavigator for CliNavigator {
    fn request_reauthentication(&self) {
        eprintln!("{}", "Your session has expired. Your message was saved.".yellow());
        eprintln!(
            "   Refresh {} and run {} to send it.",
            self.token_env.cyan(),
            "parley replay".green()
        );
    }
}
