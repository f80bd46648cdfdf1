use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use super::traits::WorkflowApi;
use crate::http::StartRequest;
use crate::telemetry::{create_workflow_span, generate_correlation_id};
use crate::transport::{ChannelEvent, ChannelManager};
use crate::workflow::{
    InboundMessage, WorkflowEvent, WorkflowPhase, WorkflowSession, WorkflowSnapshot,
    WorkflowStateMachine,
};

/// Why a submission was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The text was empty after trimming whitespace.
    EmptyText,
    /// A workflow is still initiating or active.
    Busy,
}

/// Result of [`SessionOrchestrator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The workflow was initiated and the channel is opening.
    Started { workflow_id: String },
    /// Nothing happened; state is unchanged.
    Rejected(RejectReason),
    /// The initiation call failed and the session is now `failed`.
    Failed { message: String },
}

/// Entry point for submitting messages and observing the current workflow.
///
/// Owns the state machine and the channel; every mutation happens on the
/// task that calls into it.
pub struct SessionOrchestrator {
    api: Arc<dyn WorkflowApi>,
    channel: ChannelManager,
    machine: WorkflowStateMachine,
}

impl SessionOrchestrator {
    pub fn new(api: Arc<dyn WorkflowApi>, channel: ChannelManager) -> Self {
        Self {
            api,
            channel,
            machine: WorkflowStateMachine::new(),
        }
    }

    /// Start a workflow for `text`. Rejected while another one is in flight.
    pub async fn submit(&mut self, text: &str, user_id: &str, session_id: &str) -> SubmitOutcome {
        if self.machine.is_processing() {
            debug!(phase = %self.machine.phase(), "Workflow in flight, rejecting submission");
            return SubmitOutcome::Rejected(RejectReason::Busy);
        }
        if text.trim().is_empty() {
            debug!("Empty submission rejected");
            return SubmitOutcome::Rejected(RejectReason::EmptyText);
        }

        self.channel.disconnect();
        self.channel.bind(None);
        self.machine.handle(&WorkflowEvent::Reset);
        self.machine.handle(&WorkflowEvent::Initiate);

        let request = StartRequest {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            text: text.to_string(),
        };
        let correlation_id = generate_correlation_id();
        let span = create_workflow_span("submit", None, Some(&correlation_id));

        let started = self
            .api
            .start_workflow(&request)
            .instrument(span.clone())
            .await;

        let _guard = span.enter();
        match started {
            Ok(ticket) => {
                span.record("workflow.id", ticket.workflow_id.as_str());
                info!(workflow_id = %ticket.workflow_id, "Workflow initiated");
                self.machine.handle(&WorkflowEvent::Bind {
                    workflow_id: ticket.workflow_id.clone(),
                });
                self.channel.bind(Some(ticket.workflow_id.clone()));
                self.channel.connect();
                SubmitOutcome::Started {
                    workflow_id: ticket.workflow_id,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Workflow initiation failed");
                self.machine.handle(&WorkflowEvent::failure(message.clone()));
                SubmitOutcome::Failed { message }
            }
        }
    }

    /// Cancel any pending reconnect, close the channel and clear the session.
    pub fn reset(&mut self) {
        self.channel.disconnect();
        self.channel.bind(None);
        self.machine.handle(&WorkflowEvent::Reset);
        info!("Session reset");
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            phase: self.machine.phase(),
            session: self.machine.session().clone(),
            is_processing: self.machine.is_processing(),
            connected: self.channel.is_connected(),
        }
    }

    pub fn session(&self) -> &WorkflowSession {
        self.machine.session()
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.machine.phase()
    }

    pub fn is_processing(&self) -> bool {
        self.machine.is_processing()
    }

    pub fn channel(&self) -> &ChannelManager {
        &self.channel
    }

    /// Forward a client frame over the channel. Dropped unless connected.
    pub fn send(&self, message: &serde_json::Value) -> bool {
        self.channel.send(message)
    }

    /// Apply the next channel event and return the resulting snapshot.
    ///
    /// Returns `None` when no channel is open or reconnecting.
    pub async fn next_update(&mut self) -> Option<WorkflowSnapshot> {
        if !self.channel.is_engaged() {
            return None;
        }

        match self.channel.next_event().await {
            ChannelEvent::Message(frame) => {
                if let Some(event) = InboundMessage::decode(frame).and_then(InboundMessage::into_event) {
                    self.machine.handle(&event);
                }
                if self.machine.phase().is_terminal() {
                    debug!(phase = %self.machine.phase(), "Workflow finished, releasing channel");
                    self.channel.disconnect();
                    self.channel.bind(None);
                }
            }
            ChannelEvent::Connected { url } => debug!(%url, "Channel attached"),
            ChannelEvent::Error(message) => debug!(error = %message, "Channel reported an error"),
            ChannelEvent::Closed {
                reconnect_scheduled,
            } => debug!(reconnect_scheduled, "Channel closed"),
        }

        Some(self.snapshot())
    }

    /// Pump channel events until the workflow finishes or the channel disengages.
    pub async fn wait_for_terminal(&mut self) -> WorkflowSnapshot {
        while !self.machine.phase().is_terminal() {
            if self.next_update().await.is_none() {
                break;
            }
        }
        self.snapshot()
    }
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("channel", &self.channel)
            .field("machine", &self.machine)
            .finish()
    }
}
