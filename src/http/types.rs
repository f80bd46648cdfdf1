// Request and response bodies of the Athena HTTP API

use serde::{Deserialize, Serialize};

use crate::workflow::types::WorkflowStep;

/// Body of both `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub user_id: String,
    pub session_id: String,
    pub text: String,
}

/// Response of `POST /chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTicket {
    pub workflow_id: String,
    #[serde(default)]
    pub websocket_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Response of the synchronous `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(default)]
    pub workflow_id: Option<String>,
    pub user_id: String,
    pub session_id: String,
    pub user_input: String,
    pub athena_response: String,
    #[serde(default)]
    pub workflow_steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub metrics: serde_json::Value,
    #[serde(default)]
    pub ego_state: serde_json::Value,
    #[serde(default)]
    pub empathy_metrics: serde_json::Value,
    #[serde(default)]
    pub crisis_mode: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response of `GET /metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub ego_metrics: serde_json::Value,
    #[serde(default)]
    pub empathy_metrics: Option<serde_json::Value>,
    pub interaction_count: u64,
    #[serde(default)]
    pub session_duration: Option<f64>,
}

/// Response of `GET /ego/state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EgoStateResponse {
    pub ego_strength: f64,
    pub ego_fragility: f64,
    pub consistency: f64,
    pub evolution_trend: String,
    #[serde(default)]
    pub dimensions: std::collections::BTreeMap<String, std::collections::BTreeMap<String, f64>>,
    #[serde(default)]
    pub defense_stats: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetEgoRequest {
    pub initial_strength: Option<f64>,
}

/// Response of `POST /ego/reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetEgoResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}
