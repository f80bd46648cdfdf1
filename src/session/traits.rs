use async_trait::async_trait;

use crate::http::{ApiError, StartRequest, WorkflowTicket};

/// The initiation call the orchestrator depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Start a workflow for one message and return its identifier.
    async fn start_workflow(&self, request: &StartRequest) -> Result<WorkflowTicket, ApiError>;
}
