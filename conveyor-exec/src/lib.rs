#![forbid(unsafe_code)]

//! Runtime engine for Conveyor pipelines.
//!
//! Definition parsing and validation live in `conveyor-core`; this crate
//! compiles a validated definition and interprets it, one independent run
//! per triggering event.

pub mod compile;
pub mod engine;
pub mod retry;

pub use crate::compile::{compile, CompiledCatch, CompiledPipeline, CompiledStage, StateRef};
pub use crate::engine::{
    CancelToken, CompositeEventSink, ErrorRecord, Event, EventSink, ExecutionDocument,
    ExecutionRecord, ExecutorRegistry, InvariantViolation, NoOpEventSink, Orchestrator,
    PathResolutionError, RunStatus, StdoutEventSink, TaskError, TaskExecutor, TriggerEvent,
};
pub use crate::retry::{decide_retry, AttemptCounters, RetryDecision, StopReason};
