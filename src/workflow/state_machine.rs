use statig::prelude::*;

use super::events::WorkflowEvent;
use super::types::{TerminalResult, WorkflowPhase, WorkflowSession, WorkflowStep};

/// Context of the workflow state machine: the session it owns and mutates.
///
/// Events are folded in arrival order. Terminal states are sticky until a
/// `Reset`, and events tagged with another workflow's identifier are dropped.
#[derive(Debug, Default)]
pub struct WorkflowMachine {
    session: WorkflowSession,
}

impl WorkflowMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// Events without an identifier belong to the bound session; the channel is
    /// already scoped per workflow.
    fn owns(&self, workflow_id: &Option<String>) -> bool {
        match workflow_id {
            None => true,
            Some(id) => self.session.workflow_id.as_deref() == Some(id.as_str()),
        }
    }

    fn ignore_stale(&self, workflow_id: &Option<String>) -> bool {
        if self.owns(workflow_id) {
            return false;
        }
        tracing::debug!(
            event_workflow_id = ?workflow_id,
            bound_workflow_id = ?self.session.workflow_id,
            "Ignoring event for a workflow that is not bound"
        );
        true
    }

    fn clear(&mut self) {
        self.session = WorkflowSession::default();
    }

    fn apply_progress(&mut self, steps: &[WorkflowStep], current_step: u32, progress_percentage: f64) {
        let mut reported = std::collections::BTreeMap::new();
        for step in steps {
            reported.insert(step.step_number, step.clone());
        }
        self.session.steps = reported;
        self.session.current_step = current_step;
        self.session.progress_percent = clamp_percent(progress_percentage);
        tracing::debug!(
            workflow_id = ?self.session.workflow_id,
            current_step = current_step,
            progress = self.session.progress_percent,
            steps = self.session.steps.len(),
            "Applied workflow progress"
        );
    }

    fn apply_complete(&mut self, result: &TerminalResult) {
        self.session.terminal_result = Some(result.clone());
        self.session.progress_percent = 100.0;
        self.session.is_active = false;
        tracing::info!(
            workflow_id = ?self.session.workflow_id,
            crisis_mode = result.crisis_mode,
            "Workflow completed"
        );
    }

    fn apply_error(&mut self, message: &str, steps: &[WorkflowStep]) {
        for step in steps {
            self.session.steps.insert(step.step_number, step.clone());
        }
        self.session.last_error = Some(message.to_string());
        self.session.is_active = false;
        tracing::warn!(
            workflow_id = ?self.session.workflow_id,
            error = %message,
            "Workflow failed"
        );
    }
}

fn clamp_percent(reported: f64) -> f64 {
    if reported.is_nan() {
        0.0
    } else {
        reported.clamp(0.0, 100.0)
    }
}

#[state_machine(initial = "State::idle()")]
impl WorkflowMachine {
    #[state]
    fn idle(&mut self, event: &WorkflowEvent) -> Outcome<State> {
        match event {
            WorkflowEvent::Initiate => {
                self.clear();
                self.session.is_active = true;
                tracing::info!("Workflow initiating");
                Transition(State::initiating())
            }
            WorkflowEvent::Reset => {
                self.clear();
                Handled
            }
            _ => {
                tracing::debug!(event = ?event, "Ignoring event while idle");
                Handled
            }
        }
    }

    #[state]
    fn initiating(&mut self, event: &WorkflowEvent) -> Outcome<State> {
        match event {
            WorkflowEvent::Bind { workflow_id } => {
                self.session.workflow_id = Some(workflow_id.clone());
                tracing::info!(workflow_id = %workflow_id, "Workflow identifier bound");
                Handled
            }
            WorkflowEvent::Progress {
                workflow_id,
                steps,
                current_step,
                progress_percentage,
            } => {
                if self.ignore_stale(workflow_id) {
                    return Handled;
                }
                self.apply_progress(steps, *current_step, *progress_percentage);
                Transition(State::active())
            }
            WorkflowEvent::Complete { workflow_id, result } => {
                if self.ignore_stale(workflow_id) {
                    return Handled;
                }
                self.apply_complete(result);
                Transition(State::completed())
            }
            WorkflowEvent::Error {
                workflow_id,
                message,
                steps,
            } => {
                if self.ignore_stale(workflow_id) {
                    return Handled;
                }
                self.apply_error(message, steps);
                Transition(State::failed())
            }
            WorkflowEvent::Reset => {
                self.clear();
                tracing::info!("Workflow reset while initiating");
                Transition(State::idle())
            }
            WorkflowEvent::Initiate => Handled,
        }
    }

    #[state]
    fn active(&mut self, event: &WorkflowEvent) -> Outcome<State> {
        match event {
            WorkflowEvent::Progress {
                workflow_id,
                steps,
                current_step,
                progress_percentage,
            } => {
                if !self.ignore_stale(workflow_id) {
                    self.apply_progress(steps, *current_step, *progress_percentage);
                }
                Handled
            }
            WorkflowEvent::Complete { workflow_id, result } => {
                if self.ignore_stale(workflow_id) {
                    return Handled;
                }
                self.apply_complete(result);
                Transition(State::completed())
            }
            WorkflowEvent::Error {
                workflow_id,
                message,
                steps,
            } => {
                if self.ignore_stale(workflow_id) {
                    return Handled;
                }
                self.apply_error(message, steps);
                Transition(State::failed())
            }
            WorkflowEvent::Reset => {
                self.clear();
                tracing::info!("Workflow reset while active");
                Transition(State::idle())
            }
            WorkflowEvent::Bind { workflow_id } => {
                tracing::warn!(workflow_id = %workflow_id, "Ignoring rebind of an active workflow");
                Handled
            }
            WorkflowEvent::Initiate => Handled,
        }
    }

    #[state]
    fn completed(&mut self, event: &WorkflowEvent) -> Outcome<State> {
        match event {
            WorkflowEvent::Reset => {
                self.clear();
                Transition(State::idle())
            }
            _ => {
                tracing::debug!(event = ?event, "Ignoring event after completion");
                Handled
            }
        }
    }

    #[state]
    fn failed(&mut self, event: &WorkflowEvent) -> Outcome<State> {
        match event {
            WorkflowEvent::Reset => {
                self.clear();
                Transition(State::idle())
            }
            _ => {
                tracing::debug!(event = ?event, "Ignoring event after failure");
                Handled
            }
        }
    }
}

/// Owner of the workflow state machine, exposing its phase and session.
pub struct WorkflowStateMachine {
    machine: StateMachine<WorkflowMachine>,
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self {
            machine: WorkflowMachine::new().state_machine(),
        }
    }

    pub fn handle(&mut self, event: &WorkflowEvent) {
        self.machine.handle(event);
    }

    pub fn phase(&self) -> WorkflowPhase {
        match self.machine.state() {
            State::Idle { .. } => WorkflowPhase::Idle,
            State::Initiating { .. } => WorkflowPhase::Initiating,
            State::Active { .. } => WorkflowPhase::Active,
            State::Completed { .. } => WorkflowPhase::Completed,
            State::Failed { .. } => WorkflowPhase::Failed,
        }
    }

    pub fn session(&self) -> &WorkflowSession {
        self.machine.inner().session()
    }

    pub fn is_processing(&self) -> bool {
        self.phase().is_processing()
    }
}

impl std::fmt::Debug for WorkflowStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowStateMachine")
            .field("phase", &self.phase())
            .field("session", self.session())
            .finish()
    }
}
