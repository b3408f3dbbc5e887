mod cancel;
mod document;
mod events;
mod orchestrator;
mod record;
mod task;

pub use cancel::CancelToken;
pub use document::{ExecutionDocument, InvariantViolation, PathResolutionError};
pub use events::{CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink};
pub use orchestrator::Orchestrator;
pub use record::{ErrorRecord, ExecutionRecord, RunStatus, TriggerEvent};
pub use task::{classifications, ExecutorRegistry, TaskError, TaskExecutor};
