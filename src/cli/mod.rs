use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "athena-console")]
#[command(about = "Operator console for the Athena conversational-analysis workflow")]
#[command(long_about = "Athena Console submits messages to the Athena pipeline, follows the nine \
                       analysis steps live over the workflow channel, and queries aggregate metrics \
                       and ego state. Get started with 'athena-console chat \"hello\"'.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a message and follow its workflow until it completes
    Chat {
        /// Message to send
        #[arg(help = "Text of the message to analyse")]
        text: String,
        /// User identifier sent with the message
        #[arg(long, help = "User id (defaults to session.user_id from configuration)")]
        user_id: Option<String>,
        /// Session identifier sent with the message
        #[arg(long, help = "Session id (defaults to session.session_id from configuration)")]
        session_id: Option<String>,
    },
    /// Display aggregate interaction metrics
    Metrics {
        /// Show the research metrics document instead
        #[arg(long, help = "Fetch research metrics instead of the aggregate summary")]
        research: bool,
    },
    /// Display or reset the ego model state
    Ego {
        /// Reset the ego model
        #[arg(long, help = "Reset the ego model instead of displaying it")]
        reset: bool,
        /// Initial ego strength used by --reset
        #[arg(long, requires = "reset", help = "Initial strength for the reset ego (0.0-1.0)")]
        strength: Option<f64>,
    },
    /// Show the effective configuration
    Config {
        /// Write the configuration to a file instead of printing it
        #[arg(long, help = "Write the effective configuration as TOML to this path")]
        write: Option<PathBuf>,
    },
}
