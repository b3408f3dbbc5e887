use std::collections::BTreeMap;

use crate::types::{AnyValue, CatchRule, RetryRule};

/// One named unit of work, bound to a task executor by reference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageDef {
    #[serde(rename = "stage")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Task-executor reference, resolved against the registry at compile time.
    pub executor: String,

    /// Input template: parameter name to literal, `$.path`, or template string.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, AnyValue>,

    /// Single top-level key the stage's output is merged under.
    #[serde(rename = "resultPath")]
    pub result_path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<RetryRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<CatchRule>,

    /// Absent on the last stage: finishing it completes the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Terminal failure state. Reaching one halts the run with status `Failed`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FailStateDef {
    pub name: String,

    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}
