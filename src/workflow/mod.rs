// Workflow progress model and the state machine that folds producer events into it

pub mod events;
pub mod state_machine;
pub mod types;

pub use events::{InboundMessage, ProgressReport, WorkflowEvent};
pub use state_machine::{WorkflowMachine, WorkflowStateMachine};
pub use types::{
    StepName, StepPayload, StepStatus, TerminalResult, WorkflowPhase, WorkflowSession,
    WorkflowSnapshot, WorkflowStep, PIPELINE_STEPS,
};
