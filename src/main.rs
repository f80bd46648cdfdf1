use anyhow::Result;
use clap::Parser;

use athena_console::cli::commands::{
    show_how_to_use, ChatCommand, ConfigCommand, EgoCommand, MetricsCommand,
};
use athena_console::cli::{Cli, Commands};
use athena_console::{config, init_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config()?.clone();
    init_telemetry(&config.observability)?;

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        // No subcommand: explain how to use the console
        None => runtime.block_on(async { show_how_to_use().await }),
        Some(Commands::Chat {
            text,
            user_id,
            session_id,
        }) => runtime.block_on(async {
            ChatCommand::new(text, config)
                .with_user_id(user_id)
                .with_session_id(session_id)
                .execute()
                .await
        }),
        Some(Commands::Metrics { research }) => runtime.block_on(async {
            MetricsCommand::new(config)
                .with_research(research)
                .execute()
                .await
        }),
        Some(Commands::Ego { reset, strength }) => runtime.block_on(async {
            EgoCommand::new(config)
                .with_reset(reset, strength)
                .execute()
                .await
        }),
        Some(Commands::Config { write }) => runtime.block_on(async {
            ConfigCommand::new(config).with_write(write).execute().await
        }),
    }
}
