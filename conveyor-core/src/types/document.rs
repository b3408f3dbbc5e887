use crate::types::{FailStateDef, StageDef};

/// The declarative state-machine document, loaded once at process start and
/// shared read-only by every run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineDefinition {
    /// The Conveyor definition version (e.g. "1.0").
    pub conveyor: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "startAt")]
    pub start_at: String,

    pub stages: Vec<StageDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[serde(rename = "failStates")]
    pub fail_states: Vec<FailStateDef>,

    /// Default fail state for errors no catch rule intercepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "onError")]
    pub on_error: Option<String>,
}

impl PipelineDefinition {
    pub fn stage(&self, name: &str) -> Option<&StageDef> {
        self.stages.iter().find(|s| s.name == name)
    }

    pub fn fail_state(&self, name: &str) -> Option<&FailStateDef> {
        self.fail_states.iter().find(|f| f.name == name)
    }
}
