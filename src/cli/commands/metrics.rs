use anyhow::Result;

use crate::cli::commands::connect_api;
use crate::config::ConsoleConfig;
use crate::http::MetricsResponse;

pub struct MetricsCommand {
    pub research: bool,
    pub config: ConsoleConfig,
}

impl MetricsCommand {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            research: false,
            config,
        }
    }

    pub fn with_research(mut self, research: bool) -> Self {
        self.research = research;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let api = connect_api(&self.config)?;

        if self.research {
            println!("🔬 Research metrics");
            let document = api.research_metrics().await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
            return Ok(());
        }

        let metrics = api.metrics().await?;
        for line in render_metrics(&metrics) {
            println!("{line}");
        }
        Ok(())
    }
}

fn render_metrics(metrics: &MetricsResponse) -> Vec<String> {
    let mut lines = vec![
        "📊 ATHENA METRICS".to_string(),
        format!("   💬 Interactions: {}", metrics.interaction_count),
    ];
    if let Some(duration) = metrics.session_duration {
        lines.push(format!("   ⏱️  Session duration: {duration:.1}s"));
    }
    lines.extend(render_section("🧠 Ego", &metrics.ego_metrics));
    if let Some(empathy) = &metrics.empathy_metrics {
        lines.extend(render_section("🤝 Empathy", empathy));
    }
    lines
}

fn render_section(title: &str, value: &serde_json::Value) -> Vec<String> {
    let mut lines = vec![format!("   {title}:")];
    match value.as_object() {
        Some(fields) => {
            for (key, field) in fields {
                let shown = match field {
                    serde_json::Value::Number(n) => n
                        .as_f64()
                        .map(|v| format!("{v:.3}"))
                        .unwrap_or_else(|| n.to_string()),
                    other => other.to_string(),
                };
                lines.push(format!("      {key}: {shown}"));
            }
        }
        None => lines.push(format!("      {value}")),
    }
    lines
}
