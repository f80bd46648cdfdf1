use anyhow::Result;

use crate::cli::commands::connect_api;
use crate::config::ConsoleConfig;
use crate::http::EgoStateResponse;

pub struct EgoCommand {
    pub reset: bool,
    pub strength: Option<f64>,
    pub config: ConsoleConfig,
}

impl EgoCommand {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            reset: false,
            strength: None,
            config,
        }
    }

    pub fn with_reset(mut self, reset: bool, strength: Option<f64>) -> Self {
        self.reset = reset;
        self.strength = strength;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let api = connect_api(&self.config)?;

        if self.reset {
            if let Some(strength) = self.strength {
                if !(0.0..=1.0).contains(&strength) {
                    anyhow::bail!("strength must be between 0.0 and 1.0, got {strength}");
                }
            }
            let response = api.reset_ego(self.strength).await?;
            println!("♻️  Ego reset: {}", response.status);
            if let Some(message) = response.message {
                println!("   {message}");
            }
            return Ok(());
        }

        let state = api.ego_state().await?;
        for line in render_ego(&state) {
            println!("{line}");
        }
        Ok(())
    }
}

fn render_ego(state: &EgoStateResponse) -> Vec<String> {
    let mut lines = vec![
        "🧠 EGO STATE".to_string(),
        format!("   💪 Strength:    {:.3}", state.ego_strength),
        format!("   🪞 Fragility:   {:.3}", state.ego_fragility),
        format!("   🎯 Consistency: {:.3}", state.consistency),
        format!("   📈 Trend:       {}", state.evolution_trend),
    ];
    if !state.dimensions.is_empty() {
        lines.push("   Dimensions:".to_string());
        for (name, values) in &state.dimensions {
            let shown = values
                .iter()
                .map(|(key, value)| format!("{key}={value:.2}"))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("      {name}: {shown}"));
        }
    }
    lines
}
