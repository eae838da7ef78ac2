use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    about = "Push registration state and notification history",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch new notifications once and print the summary
    Sync,

    /// Sync, then keep the "last notification" line up to date until Ctrl-C
    Watch,

    /// List stored notifications, newest first
    History,

    /// Show the details of one notification
    Show {
        /// Identifier as printed by `history` (hex for byte identifiers)
        id: String,
    },

    /// Show push registration state
    Status,

    /// Deliver the outcome of a push registration attempt
    Register(RegisterArgs),
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Device token reported by the push framework, hex encoded
    #[arg(required_unless_present = "fail")]
    pub token: Option<String>,

    /// Report a failed registration with this reason instead
    #[arg(long, conflicts_with = "token")]
    pub fail: Option<String>,
}
