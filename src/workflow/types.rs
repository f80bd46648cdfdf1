use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Number of stages the backend pipeline runs for one message.
pub const PIPELINE_STEPS: u32 = 9;

/// Identifier of a pipeline stage as reported by the producer.
///
/// The nine known stages are modelled explicitly; anything else is kept
/// verbatim so it can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepName {
    EmotionAnalysis,
    UserPainCalculation,
    MbtiDetection,
    EgoImpactAnalysis,
    AthenaPainCalculation,
    EmpathyMetrics,
    ResponseGeneration,
    PersonalityAdaptation,
    CrisisCheck,
    Other(String),
}

impl StepName {
    /// Known stages in pipeline order.
    pub const KNOWN: [StepName; 9] = [
        StepName::EmotionAnalysis,
        StepName::UserPainCalculation,
        StepName::MbtiDetection,
        StepName::EgoImpactAnalysis,
        StepName::AthenaPainCalculation,
        StepName::EmpathyMetrics,
        StepName::ResponseGeneration,
        StepName::PersonalityAdaptation,
        StepName::CrisisCheck,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            StepName::EmotionAnalysis => "emotion_analysis",
            StepName::UserPainCalculation => "user_pain_calculation",
            StepName::MbtiDetection => "mbti_detection",
            StepName::EgoImpactAnalysis => "ego_impact_analysis",
            StepName::AthenaPainCalculation => "athena_pain_calculation",
            StepName::EmpathyMetrics => "empathy_metrics",
            StepName::ResponseGeneration => "response_generation",
            StepName::PersonalityAdaptation => "personality_adaptation",
            StepName::CrisisCheck => "crisis_check",
            StepName::Other(name) => name,
        }
    }

    /// Position of a known stage in the pipeline (1-based).
    pub fn ordinal(&self) -> Option<u32> {
        Self::KNOWN
            .iter()
            .position(|known| known == self)
            .map(|index| index as u32 + 1)
    }

    /// Human-readable label. Unknown names are title-cased.
    pub fn label(&self) -> String {
        match self {
            StepName::EmotionAnalysis => "Emotion Analysis".to_string(),
            StepName::UserPainCalculation => "User Pain Calculation".to_string(),
            StepName::MbtiDetection => "MBTI Detection".to_string(),
            StepName::EgoImpactAnalysis => "Ego Impact Analysis".to_string(),
            StepName::AthenaPainCalculation => "Athena Pain Calculation".to_string(),
            StepName::EmpathyMetrics => "Empathy Metrics".to_string(),
            StepName::ResponseGeneration => "Response Generation".to_string(),
            StepName::PersonalityAdaptation => "Personality Adaptation".to_string(),
            StepName::CrisisCheck => "Crisis Check".to_string(),
            StepName::Other(name) => title_case(name),
        }
    }

    pub fn is_unnamed(&self) -> bool {
        matches!(self, StepName::Other(name) if name.is_empty())
    }
}

impl Default for StepName {
    fn default() -> Self {
        StepName::Other(String::new())
    }
}

impl From<String> for StepName {
    fn from(name: String) -> Self {
        Self::KNOWN
            .iter()
            .find(|known| known.as_str() == name)
            .cloned()
            .unwrap_or(StepName::Other(name))
    }
}

impl From<StepName> for String {
    fn from(name: StepName) -> Self {
        match name {
            StepName::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn title_case(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Error => "error",
        };
        f.write_str(text)
    }
}

/// Free-form data a stage attaches to its update.
///
/// The synchronisation engine never looks inside; only display code does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepPayload(serde_json::Value);

impl StepPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// Observed status of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step_number: u32,
    #[serde(default)]
    pub step_name: StepName,
    pub status: StepStatus,
    #[serde(default, rename = "data", skip_serializing_if = "Option::is_none")]
    pub payload: Option<StepPayload>,
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(
        default,
        rename = "timestamp",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub observed_at: Option<DateTime<Utc>>,
}

impl WorkflowStep {
    pub fn new(step_number: u32, step_name: StepName, status: StepStatus) -> Self {
        Self {
            step_number,
            step_name,
            status,
            payload: None,
            error_message: None,
            observed_at: None,
        }
    }

    /// Label for display, falling back to `step_{n}` when the producer sent no name.
    pub fn display_name(&self) -> String {
        if self.step_name.is_unnamed() {
            format!("step_{}", self.step_number)
        } else {
            self.step_name.label()
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(parse_timestamp))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Payload of a `workflow_complete` event.
///
/// Only `crisis_mode` means anything to the engine; the rest is carried
/// through to consumers untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalResult {
    pub athena_response: String,
    #[serde(default)]
    pub crisis_mode: bool,
    #[serde(default)]
    pub metrics: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Aggregate root for the one workflow a console tracks at a time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WorkflowSession {
    pub workflow_id: Option<String>,
    pub steps: BTreeMap<u32, WorkflowStep>,
    pub current_step: u32,
    pub progress_percent: f64,
    pub terminal_result: Option<TerminalResult>,
    pub is_active: bool,
    pub last_error: Option<String>,
}

impl WorkflowSession {
    pub fn step(&self, step_number: u32) -> Option<&WorkflowStep> {
        self.steps.get(&step_number)
    }

    /// Steps in step-number order.
    pub fn ordered_steps(&self) -> impl Iterator<Item = &WorkflowStep> {
        self.steps.values()
    }

    pub fn crisis_mode(&self) -> bool {
        self.terminal_result
            .as_ref()
            .map(|result| result.crisis_mode)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowPhase {
    Idle,
    Initiating,
    Active,
    Completed,
    Failed,
}

impl WorkflowPhase {
    pub fn is_processing(self) -> bool {
        matches!(self, WorkflowPhase::Initiating | WorkflowPhase::Active)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowPhase::Completed | WorkflowPhase::Failed)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::Initiating => "initiating",
            WorkflowPhase::Active => "active",
            WorkflowPhase::Completed => "completed",
            WorkflowPhase::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Point-in-time copy of the session handed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub phase: WorkflowPhase,
    pub session: WorkflowSession,
    pub is_processing: bool,
    pub connected: bool,
}
