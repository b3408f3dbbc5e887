mod decision;

pub use decision::{decide_retry, RetryDecision, StopReason};

/// Per-stage-execution attempt counters, one per declared retry rule.
///
/// Transient: created fresh each time a stage begins executing within a run
/// and discarded when the stage commits or fails over to catch handling.
#[derive(Debug, Clone)]
pub struct AttemptCounters {
    counts: Vec<u32>,
}

impl AttemptCounters {
    pub fn new(rule_count: usize) -> Self {
        Self {
            counts: vec![0; rule_count],
        }
    }

    pub fn made(&self, rule_index: usize) -> u32 {
        self.counts[rule_index]
    }

    pub fn record(&mut self, rule_index: usize) {
        self.counts[rule_index] += 1;
    }
}
