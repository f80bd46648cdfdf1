// Session orchestration: submit a message, bind the channel, expose snapshots

pub mod orchestrator;
pub mod traits;

pub use orchestrator::{RejectReason, SessionOrchestrator, SubmitOutcome};
pub use traits::WorkflowApi;
