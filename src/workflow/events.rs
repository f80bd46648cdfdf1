// Inbound producer frames and their translation into state machine events

use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{TerminalResult, WorkflowStep};

/// Frames the producer pushes over the streaming channel, keyed by `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    WorkflowProgress {
        progress: ProgressReport,
    },
    WorkflowComplete {
        #[serde(default)]
        workflow_id: Option<String>,
        result: TerminalResult,
    },
    WorkflowError {
        #[serde(default)]
        workflow_id: Option<String>,
        error: String,
        #[serde(default)]
        steps: Vec<WorkflowStep>,
    },
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub current_step: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub total_steps: Option<u32>,
}

/// Closed set of inputs the workflow state machine folds.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A submission was accepted and the initiation call is about to go out.
    Initiate,
    /// The initiation call returned the workflow identifier.
    Bind { workflow_id: String },
    Progress {
        workflow_id: Option<String>,
        steps: Vec<WorkflowStep>,
        current_step: u32,
        progress_percentage: f64,
    },
    Complete {
        workflow_id: Option<String>,
        result: TerminalResult,
    },
    Error {
        workflow_id: Option<String>,
        message: String,
        steps: Vec<WorkflowStep>,
    },
    Reset,
}

impl WorkflowEvent {
    /// Workflow-level failure that carries no identifier or steps.
    pub fn failure(message: impl Into<String>) -> Self {
        WorkflowEvent::Error {
            workflow_id: None,
            message: message.into(),
            steps: Vec::new(),
        }
    }
}

impl InboundMessage {
    /// Decode a parsed frame. Frames that do not fit the envelope are logged and dropped.
    pub fn decode(frame: serde_json::Value) -> Option<Self> {
        match serde_json::from_value::<InboundMessage>(frame) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(error = %e, "Discarding frame that does not match the workflow envelope");
                None
            }
        }
    }

    /// Translate into a state machine event; unrecognised frame types yield nothing.
    pub fn into_event(self) -> Option<WorkflowEvent> {
        match self {
            InboundMessage::WorkflowProgress { progress } => Some(WorkflowEvent::Progress {
                workflow_id: progress.workflow_id,
                steps: progress.steps,
                current_step: progress.current_step,
                progress_percentage: progress.progress_percentage,
            }),
            InboundMessage::WorkflowComplete {
                workflow_id,
                result,
            } => {
                // The result body repeats the identifier; fall back to it.
                let workflow_id = workflow_id.or_else(|| {
                    result
                        .extra
                        .get("workflow_id")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string)
                });
                Some(WorkflowEvent::Complete {
                    workflow_id,
                    result,
                })
            }
            InboundMessage::WorkflowError {
                workflow_id,
                error,
                steps,
            } => Some(WorkflowEvent::Error {
                workflow_id,
                message: error,
                steps,
            }),
            InboundMessage::Unrecognized => {
                debug!("Ignoring frame with unrecognised type");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::StepStatus;
    use serde_json::json;

    #[test]
    fn test_progress_frame_decodes_into_progress_event() {
        let frame = json!({
            "type": "workflow_progress",
            "progress": {
                "workflow_id": "w1",
                "current_step": 1,
                "total_steps": 9,
                "progress_percentage": 11.1,
                "steps": [{"step_number": 1, "step_name": "emotion_analysis", "status": "processing",
                           "data": {"message": "Analyzing user emotions..."}}]
            }
        });

        let event = InboundMessage::decode(frame).and_then(InboundMessage::into_event);
        match event {
            Some(WorkflowEvent::Progress {
                workflow_id,
                steps,
                current_step,
                progress_percentage,
            }) => {
                assert_eq!(workflow_id.as_deref(), Some("w1"));
                assert_eq!(current_step, 1);
                assert!((progress_percentage - 11.1).abs() < f64::EPSILON);
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].status, StepStatus::Processing);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_complete_frame_takes_identifier_from_result_body() {
        let frame = json!({
            "type": "workflow_complete",
            "result": {"athena_response": "hi there", "crisis_mode": false,
                       "metrics": {}, "timestamp": "2025-03-01T10:00:00", "workflow_id": "w9"}
        });

        match InboundMessage::decode(frame).and_then(InboundMessage::into_event) {
            Some(WorkflowEvent::Complete { workflow_id, result }) => {
                assert_eq!(workflow_id.as_deref(), Some("w9"));
                assert_eq!(result.athena_response, "hi there");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_error_frame_carries_producer_steps() {
        let frame = json!({
            "type": "workflow_error",
            "workflow_id": "w1",
            "error": "pipeline failure",
            "steps": [{"step_number": 3, "step_name": "error", "status": "error", "error": "pipeline failure"}]
        });

        match InboundMessage::decode(frame).and_then(InboundMessage::into_event) {
            Some(WorkflowEvent::Error { message, steps, .. }) => {
                assert_eq!(message, "pipeline failure");
                assert_eq!(steps[0].status, StepStatus::Error);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let frame = json!({"type": "echo", "data": "ping"});
        let message = InboundMessage::decode(frame);
        assert_eq!(message, Some(InboundMessage::Unrecognized));
        assert_eq!(message.and_then(InboundMessage::into_event), None);
    }

    #[test]
    fn test_structurally_invalid_frames_are_dropped() {
        assert_eq!(InboundMessage::decode(json!({"progress": {}})), None);
        assert_eq!(
            InboundMessage::decode(json!({"type": "workflow_error", "error": 42})),
            None
        );
        assert_eq!(
            InboundMessage::decode(json!({"type": "workflow_complete", "result": {}})),
            None
        );
    }
}
