use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::compile::{CompiledPipeline, CompiledStage, StateRef};
use crate::engine::cancel::CancelToken;
use crate::engine::document::{ExecutionDocument, InvariantViolation};
use crate::engine::events::{Event, EventSink};
use crate::engine::record::{ErrorRecord, ExecutionRecord, RunStatus, TriggerEvent};
use crate::engine::task::{classifications, ExecutorRegistry, TaskError};
use crate::retry::{decide_retry, AttemptCounters, RetryDecision};

/// Diagnostic key used when no catch rule intercepts an error.
const DEFAULT_ERROR_KEY: &str = "error";

/// Interprets a compiled pipeline, one independent run per trigger.
///
/// A run owns its execution document and attempt counters exclusively;
/// the orchestrator itself holds no per-run state and many runs may be
/// driven concurrently from the same instance.
pub struct Orchestrator {
    registry: Arc<ExecutorRegistry>,
    event_sink: Arc<dyn EventSink>,
}

/// How one stage execution (attempts, retries, catch evaluation) ended.
enum StageOutcome {
    /// Result merged; follow the stage's `next` edge.
    Advanced,
    /// A catch rule intercepted the error and redirected the flow.
    Caught { next: StateRef, error: ErrorRecord },
    /// No catch rule matched; route to the default fail state.
    Uncaught { error: ErrorRecord },
    /// The run was aborted at a suspension point.
    Cancelled { error: ErrorRecord },
}

impl Orchestrator {
    pub fn new(registry: Arc<ExecutorRegistry>, event_sink: Arc<dyn EventSink>) -> Self {
        Self {
            registry,
            event_sink,
        }
    }

    /// Execute one run to a terminal status.
    ///
    /// Stage errors never escape: they are retried, caught, or recorded on
    /// the failed run. The only error a caller sees is an internal
    /// invariant breach, which is a defect rather than a run outcome.
    pub async fn run(
        &self,
        pipeline: &CompiledPipeline,
        trigger: TriggerEvent,
        cancel: CancelToken,
    ) -> Result<ExecutionRecord, InvariantViolation> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut document = ExecutionDocument::seed(&trigger);

        self.event_sink
            .emit(Event::RunStarted {
                run_id,
                pipeline: pipeline.name.clone(),
            })
            .await;

        let mut current = pipeline.start;
        let mut pending_error: Option<ErrorRecord> = None;

        let (status, final_state, error) = loop {
            match current {
                StateRef::Fail(i) => {
                    let fail = &pipeline.fail_states[i];
                    let error = pending_error.take().unwrap_or_else(|| ErrorRecord {
                        error_type: fail.error.clone(),
                        cause: fail.cause.clone().unwrap_or_default(),
                    });
                    break (RunStatus::Failed, fail.name.clone(), Some(error));
                }
                StateRef::Stage(i) => {
                    let stage = &pipeline.stages[i];
                    self.event_sink
                        .emit(Event::StageStarted {
                            run_id,
                            stage: stage.name.clone(),
                        })
                        .await;

                    match self
                        .execute_stage(run_id, stage, &mut document, &cancel)
                        .await?
                    {
                        StageOutcome::Advanced => match stage.next {
                            Some(next) => current = next,
                            None => break (RunStatus::Succeeded, stage.name.clone(), None),
                        },
                        StageOutcome::Caught { next, error } => {
                            pending_error = Some(error);
                            current = next;
                        }
                        StageOutcome::Uncaught { error } => {
                            pending_error = Some(error);
                            current = StateRef::Fail(pipeline.default_fail);
                        }
                        StageOutcome::Cancelled { error } => {
                            break (RunStatus::Failed, stage.name.clone(), Some(error));
                        }
                    }
                }
            }
        };

        self.event_sink
            .emit(Event::RunFinished {
                run_id,
                pipeline: pipeline.name.clone(),
                status,
                final_state: final_state.clone(),
                error: error.clone(),
            })
            .await;

        Ok(ExecutionRecord {
            run_id,
            pipeline: pipeline.name.clone(),
            status,
            final_state,
            document: document.into_value(),
            error,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Drive one stage through its attempt loop: resolve input, invoke,
    /// retry per policy, and on an uncontained error evaluate catch rules.
    async fn execute_stage(
        &self,
        run_id: Uuid,
        stage: &CompiledStage,
        document: &mut ExecutionDocument,
        cancel: &CancelToken,
    ) -> Result<StageOutcome, InvariantViolation> {
        let executor = self.registry.get(&stage.executor).ok_or_else(|| {
            InvariantViolation::ExecutorNotRegistered {
                name: stage.executor.clone(),
            }
        })?;

        let mut counters = AttemptCounters::new(stage.retry.len());
        let mut attempt_no: u32 = 1;

        loop {
            // Input is re-resolved each attempt; the document cannot have
            // changed between attempts, but a resolution failure must flow
            // through the same retry/catch path as an executor error.
            let failure = match document.resolve_parameters(&stage.parameters) {
                Ok(input) => {
                    self.event_sink
                        .emit(Event::AttemptStarted {
                            run_id,
                            stage: stage.name.clone(),
                            attempt_no,
                        })
                        .await;

                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Ok(StageOutcome::Cancelled {
                                error: cancellation_record(&stage.name),
                            });
                        }
                        result = executor.invoke(&stage.name, &input) => result,
                    };

                    match result {
                        Ok(output) => {
                            self.event_sink
                                .emit(Event::AttemptFinished {
                                    run_id,
                                    stage: stage.name.clone(),
                                    attempt_no,
                                    succeeded: true,
                                })
                                .await;
                            document.merge(&stage.result_key, output)?;
                            self.event_sink
                                .emit(Event::StageSucceeded {
                                    run_id,
                                    stage: stage.name.clone(),
                                })
                                .await;
                            return Ok(StageOutcome::Advanced);
                        }
                        Err(e) => {
                            self.event_sink
                                .emit(Event::AttemptFinished {
                                    run_id,
                                    stage: stage.name.clone(),
                                    attempt_no,
                                    succeeded: false,
                                })
                                .await;
                            e
                        }
                    }
                }
                Err(e) => TaskError::new(classifications::PATH_RESOLUTION, e.to_string()),
            };

            match decide_retry(&stage.retry, &mut counters, &failure.classification) {
                RetryDecision::RetryAfter { delay } => {
                    self.event_sink
                        .emit(Event::RetryScheduled {
                            run_id,
                            stage: stage.name.clone(),
                            delay,
                            classification: failure.classification.clone(),
                        })
                        .await;

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Ok(StageOutcome::Cancelled {
                                error: cancellation_record(&stage.name),
                            });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt_no += 1;
                }
                RetryDecision::Stop { .. } => {
                    self.event_sink
                        .emit(Event::StageFailed {
                            run_id,
                            stage: stage.name.clone(),
                            classification: failure.classification.clone(),
                            message: failure.message.clone(),
                        })
                        .await;

                    let error = ErrorRecord::from(&failure);
                    let error_value = serde_json::to_value(&error)
                        .expect("error record serializes");

                    for rule in &stage.catch {
                        if rule.matches(&failure.classification) {
                            document.merge(&rule.result_key, error_value)?;
                            return Ok(StageOutcome::Caught {
                                next: rule.next,
                                error,
                            });
                        }
                    }

                    document.merge(DEFAULT_ERROR_KEY, error_value)?;
                    return Ok(StageOutcome::Uncaught { error });
                }
            }
        }
    }
}

fn cancellation_record(stage: &str) -> ErrorRecord {
    ErrorRecord {
        error_type: classifications::CANCELLED.to_string(),
        cause: format!("run cancelled while executing stage {stage}"),
    }
}
