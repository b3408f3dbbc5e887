/// Matches any error classification in `errorEquals` sets.
pub const WILDCARD: &str = "*";

/// One retry rule of a stage's ordered, first-match-wins retry policy.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryRule {
    #[serde(rename = "errorEquals")]
    pub error_equals: Vec<String>,

    /// Delay before the first retry, in whole seconds.
    #[serde(rename = "intervalSeconds", default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Retries allowed after the initial attempt. Zero disables the rule.
    #[serde(rename = "maxAttempts")]
    pub max_attempts: u32,

    #[serde(rename = "backoffRate", default = "default_backoff_rate")]
    pub backoff_rate: f64,
}

impl RetryRule {
    pub fn matches(&self, classification: &str) -> bool {
        self.error_equals
            .iter()
            .any(|c| c == WILDCARD || c == classification)
    }
}

fn default_interval_seconds() -> u64 {
    1
}

fn default_backoff_rate() -> f64 {
    2.0
}

/// Redirects an uncontained stage error to another state, recording the
/// error under `resultPath` on the way.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CatchRule {
    #[serde(rename = "errorEquals")]
    pub error_equals: Vec<String>,

    #[serde(rename = "resultPath", default = "default_error_path")]
    pub result_path: String,

    pub next: String,
}

impl CatchRule {
    pub fn matches(&self, classification: &str) -> bool {
        self.error_equals
            .iter()
            .any(|c| c == WILDCARD || c == classification)
    }
}

fn default_error_path() -> String {
    "$.error".to_string()
}
