use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::engine::record::{ErrorRecord, RunStatus};

/// Lifecycle notifications emitted by the orchestrator. The `RunFinished`
/// event carries everything an operator needs after the fact: run id, final
/// state, and error detail on failure.
#[derive(Debug, Clone)]
pub enum Event {
    RunStarted {
        run_id: Uuid,
        pipeline: String,
    },
    StageStarted {
        run_id: Uuid,
        stage: String,
    },
    AttemptStarted {
        run_id: Uuid,
        stage: String,
        attempt_no: u32,
    },
    AttemptFinished {
        run_id: Uuid,
        stage: String,
        attempt_no: u32,
        succeeded: bool,
    },
    RetryScheduled {
        run_id: Uuid,
        stage: String,
        delay: Duration,
        classification: String,
    },
    StageSucceeded {
        run_id: Uuid,
        stage: String,
    },
    StageFailed {
        run_id: Uuid,
        stage: String,
        classification: String,
        message: String,
    },
    RunFinished {
        run_id: Uuid,
        pipeline: String,
        status: RunStatus,
        final_state: String,
        error: Option<ErrorRecord>,
    },
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

/// One JSON line per event on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        let json = match event {
            Event::RunStarted { run_id, pipeline } => {
                json!({ "type": "run.started", "run_id": run_id.to_string(), "pipeline": pipeline })
            }
            Event::StageStarted { run_id, stage } => {
                json!({ "type": "stage.started", "run_id": run_id.to_string(), "stage": stage })
            }
            Event::AttemptStarted { run_id, stage, attempt_no } => {
                json!({ "type": "attempt.started", "run_id": run_id.to_string(), "stage": stage, "attempt_no": attempt_no })
            }
            Event::AttemptFinished { run_id, stage, attempt_no, succeeded } => {
                json!({ "type": "attempt.finished", "run_id": run_id.to_string(), "stage": stage, "attempt_no": attempt_no, "succeeded": succeeded })
            }
            Event::RetryScheduled { run_id, stage, delay, classification } => {
                json!({ "type": "stage.retry_scheduled", "run_id": run_id.to_string(), "stage": stage, "delay_ms": delay.as_millis() as u64, "classification": classification })
            }
            Event::StageSucceeded { run_id, stage } => {
                json!({ "type": "stage.succeeded", "run_id": run_id.to_string(), "stage": stage })
            }
            Event::StageFailed { run_id, stage, classification, message } => {
                json!({ "type": "stage.failed", "run_id": run_id.to_string(), "stage": stage, "classification": classification, "message": message })
            }
            Event::RunFinished { run_id, pipeline, status, final_state, error } => {
                json!({
                    "type": "run.finished",
                    "run_id": run_id.to_string(),
                    "pipeline": pipeline,
                    "status": status.as_str(),
                    "final_state": final_state,
                    "error": error.map(|e| json!({ "errorType": e.error_type, "cause": e.cause })),
                })
            }
        };
        println!("{}", serde_json::to_string(&json).unwrap_or_default());
    }
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}
