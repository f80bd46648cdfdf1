use anyhow::Result;
use std::path::PathBuf;

use crate::config::ConsoleConfig;

pub struct ConfigCommand {
    pub write: Option<PathBuf>,
    pub config: ConsoleConfig,
}

impl ConfigCommand {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            write: None,
            config,
        }
    }

    pub fn with_write(mut self, write: Option<PathBuf>) -> Self {
        self.write = write;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.write {
            Some(path) => {
                self.config.save_to_file(path)?;
                println!("💾 Configuration written to {}", path.display());
            }
            None => {
                println!("⚙️  Effective configuration");
                println!();
                print!("{}", self.config.to_toml()?);
                println!();
                println!("🔌 Channel base: {}", self.config.api.channel_base_url());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_produces_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("athena-console.toml");
        let mut config = ConsoleConfig::default();
        config.session.user_id = "operator".to_string();

        ConfigCommand::new(config.clone())
            .with_write(Some(target.clone()))
            .execute()
            .await
            .unwrap();

        let loaded = ConsoleConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded.session.user_id, "operator");
    }
}
