// Athena Console Library - live workflow synchronisation for the Athena pipeline
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod http;
pub mod session;
pub mod shutdown;
pub mod telemetry;
pub mod transport;
pub mod workflow;

// Re-export key types for easy access
pub use config::{config, ApiConfig, ChannelConfig, ConsoleConfig, ObservabilityConfig, SessionDefaults};
pub use http::{ApiError, AthenaClient, StartRequest, WorkflowTicket};
pub use session::{RejectReason, SessionOrchestrator, SubmitOutcome, WorkflowApi};
pub use shutdown::ShutdownCoordinator;
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry};
pub use transport::{
    ChannelConnection, ChannelConnector, ChannelEvent, ChannelManager, LinkState, MemoryConnector,
    MemoryPeer, MemoryServer, TransportError, WebSocketConnector,
};
pub use workflow::{
    InboundMessage, StepName, StepStatus, TerminalResult, WorkflowEvent, WorkflowPhase,
    WorkflowSession, WorkflowSnapshot, WorkflowStateMachine, WorkflowStep,
};
