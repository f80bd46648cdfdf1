use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cli::commands::connect_api;
use crate::config::ConsoleConfig;
use crate::session::{RejectReason, SessionOrchestrator, SubmitOutcome};
use crate::shutdown::ShutdownCoordinator;
use crate::transport::{ChannelManager, WebSocketConnector};
use crate::workflow::{StepStatus, WorkflowPhase, WorkflowSession, WorkflowSnapshot, PIPELINE_STEPS};

pub struct ChatCommand {
    pub text: String,
    pub user_id: String,
    pub session_id: String,
    pub config: ConsoleConfig,
}

impl ChatCommand {
    pub fn new(text: String, config: ConsoleConfig) -> Self {
        Self {
            text,
            user_id: config.session.user_id.clone(),
            session_id: config.session.session_id.clone(),
            config,
        }
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        if let Some(user_id) = user_id {
            self.user_id = user_id;
        }
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        if let Some(session_id) = session_id {
            self.session_id = session_id;
        }
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let api = connect_api(&self.config)?;
        let channel = ChannelManager::new(
            Arc::new(WebSocketConnector::new()),
            self.config.api.channel_base_url(),
        )
        .with_reconnect_delay(self.config.channel.reconnect_delay());
        let mut session = SessionOrchestrator::new(api, channel);

        println!("💬 Sending message as {} ({})", self.user_id, self.session_id);
        match session.submit(&self.text, &self.user_id, &self.session_id).await {
            SubmitOutcome::Started { workflow_id } => {
                println!("🚀 Workflow {workflow_id} started");
            }
            SubmitOutcome::Rejected(RejectReason::EmptyText) => {
                println!("⚠️  Nothing to send: the message is empty");
                return Ok(());
            }
            SubmitOutcome::Rejected(RejectReason::Busy) => {
                println!("⚠️  A workflow is already running");
                return Ok(());
            }
            SubmitOutcome::Failed { message } => {
                println!("❌ Failed to start workflow: {message}");
                return Err(anyhow::anyhow!(message));
            }
        }
        println!();

        let coordinator = ShutdownCoordinator::default();
        let finished = coordinator.run_until_signal(follow(&mut session)).await;

        let snapshot = match finished {
            Some(snapshot) => snapshot,
            None => {
                session.reset();
                println!();
                println!("🛑 Interrupted, session reset");
                return Ok(());
            }
        };

        println!();
        match snapshot.phase {
            WorkflowPhase::Completed => {
                if let Some(result) = &snapshot.session.terminal_result {
                    println!("🦉 Athena: {}", result.athena_response);
                }
                if snapshot.session.crisis_mode() {
                    println!("🚨 Crisis mode was triggered for this message");
                }
                Ok(())
            }
            WorkflowPhase::Failed => {
                let message = snapshot
                    .session
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "workflow failed".to_string());
                println!("❌ Workflow failed: {message}");
                Err(anyhow::anyhow!(message))
            }
            phase => {
                println!("⚠️  Channel closed before the workflow finished ({phase})");
                Ok(())
            }
        }
    }
}

/// Print step transitions until the workflow finishes or the channel disengages.
async fn follow(session: &mut SessionOrchestrator) -> WorkflowSnapshot {
    let mut printer = ProgressPrinter::default();
    while let Some(snapshot) = session.next_update().await {
        for line in printer.observe(&snapshot.session) {
            println!("{line}");
        }
        if snapshot.phase.is_terminal() {
            return snapshot;
        }
    }
    session.snapshot()
}

/// Turns successive sessions into one line per observed change.
#[derive(Debug, Default)]
struct ProgressPrinter {
    seen: BTreeMap<u32, StepStatus>,
    percent: Option<u32>,
}

impl ProgressPrinter {
    fn observe(&mut self, session: &WorkflowSession) -> Vec<String> {
        let mut lines = Vec::new();

        for step in session.ordered_steps() {
            if self.seen.get(&step.step_number) == Some(&step.status) {
                continue;
            }
            self.seen.insert(step.step_number, step.status);
            let icon = match step.status {
                StepStatus::Pending => "⏳",
                StepStatus::Processing => "🔄",
                StepStatus::Completed => "✅",
                StepStatus::Error => "❌",
            };
            let mut line = format!(
                "   {icon} [{}/{PIPELINE_STEPS}] {}",
                step.step_number,
                step.display_name()
            );
            if let Some(error) = &step.error_message {
                line.push_str(&format!(": {error}"));
            }
            lines.push(line);
        }

        let percent = session.progress_percent.round() as u32;
        if session.is_active && self.percent != Some(percent) {
            self.percent = Some(percent);
            lines.push(format!("   📈 {percent}% complete"));
        }

        lines
    }
}
