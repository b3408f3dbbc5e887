use chrono::{DateTime, Utc};
use conveyor_core::types::AnyValue;
use uuid::Uuid;

use crate::engine::task::TaskError;

/// Object-arrival event that starts a run and seeds the execution document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "sourceBucket")]
    pub source_bucket: String,
    #[serde(rename = "sourceKey")]
    pub source_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }
}

/// The structured error record written into the document by a catch rule
/// and carried on a failed run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "errorType")]
    pub error_type: String,
    pub cause: String,
}

impl From<&TaskError> for ErrorRecord {
    fn from(e: &TaskError) -> Self {
        Self {
            error_type: e.classification.clone(),
            cause: e.message.clone(),
        }
    }
}

/// Run-level state, exclusively owned by the orchestrator for the duration
/// of one run and returned at a terminal status.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutionRecord {
    #[serde(rename = "runId")]
    pub run_id: Uuid,
    pub pipeline: String,
    pub status: RunStatus,
    /// The stage or fail state the run ended on.
    #[serde(rename = "finalState")]
    pub final_state: String,
    pub document: AnyValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "finishedAt")]
    pub finished_at: DateTime<Utc>,
}
