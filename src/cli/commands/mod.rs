use anyhow::Result;
use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::http::AthenaClient;

pub mod chat;
pub mod config;
pub mod ego;
pub mod metrics;

pub use chat::ChatCommand;
pub use config::ConfigCommand;
pub use ego::EgoCommand;
pub use metrics::MetricsCommand;

pub fn connect_api(config: &ConsoleConfig) -> Result<Arc<AthenaClient>> {
    let client = AthenaClient::new(&config.api)?;
    tracing::debug!(base_url = %client.base_url(), "Athena API client ready");
    Ok(Arc::new(client))
}

pub async fn show_how_to_use() -> Result<()> {
    println!("🦉 Athena Console - live view of the Athena analysis pipeline");
    println!();
    println!("To get started:");
    println!("  💬 athena-console chat \"hello\"   # Send a message and follow its workflow");
    println!("  📊 athena-console metrics         # Aggregate interaction metrics");
    println!("  🧠 athena-console ego             # Current ego model state");
    println!("  ⚙️  athena-console config          # Effective configuration");
    println!();
    println!("💡 Point the console at your backend with ATHENA_CONSOLE_API__BASE_URL");
    Ok(())
}
