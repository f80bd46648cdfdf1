use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the Athena console
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Athena API settings
    pub api: ApiConfig,
    /// Streaming channel settings
    pub channel: ChannelConfig,
    /// Identity sent with each submission
    pub session: SessionDefaults,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base address of the HTTP API, including the version prefix
    pub base_url: String,
    /// Base address for workflow channels; derived from `base_url` when unset
    pub ws_url: Option<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Sustained request rate towards the API
    pub requests_per_second: u32,
    /// Burst capacity on top of the sustained rate
    pub burst: u32,
    /// How long metrics and ego-state responses are reused
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Delay before reopening a dropped channel while a workflow is bound
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is unset
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            ws_url: None,
            request_timeout_secs: 30,
            requests_per_second: 5,
            burst: 10,
            cache_ttl_secs: 5,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 1000,
        }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            user_id: "user123".to_string(),
            session_id: "session1".to_string(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            channel: ChannelConfig::default(),
            session: SessionDefaults::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Channel base address: `ws_url` if set, otherwise `base_url` with a ws scheme.
    pub fn channel_base_url(&self) -> String {
        if let Some(ws_url) = &self.ws_url {
            return ws_url.trim_end_matches('/').to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }
}

impl ChannelConfig {
    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl ConsoleConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (athena-console.toml, .athena-console-rc)
    /// 3. Environment variables (prefixed with ATHENA_CONSOLE_, sections split on `__`)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&ConsoleConfig::default())?);

        let main_file = dir.join("athena-console.toml");
        if main_file.exists() {
            builder = builder.add_source(File::from(main_file));
        }

        let rc_file = dir.join(".athena-console-rc");
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("ATHENA_CONSOLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = self.to_toml()?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Configuration of the console binary, loaded once
static CONFIG: std::sync::LazyLock<Result<ConsoleConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = ConsoleConfig::load_env_file();
        ConsoleConfig::load()
    });

/// Get the console configuration
pub fn config() -> Result<&'static ConsoleConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
