use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use conveyor_core::types::AnyValue;

/// Error classifications the engine itself produces.
pub mod classifications {
    /// A parameter template referenced a document path that does not exist.
    pub const PATH_RESOLUTION: &str = "PathResolutionError";
    /// The run was aborted externally while suspended.
    pub const CANCELLED: &str = "CancellationError";
}

/// A classified stage failure, as returned by a task executor or synthesized
/// by the engine. The classification string is what retry and catch rules
/// match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskError {
    pub classification: String,
    pub message: String,
}

impl TaskError {
    pub fn new(classification: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            classification: classification.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.classification, self.message)
    }
}

/// One pluggable compute backend for a stage.
///
/// Implementations must be idempotent-safe under retry: the same input may
/// be delivered more than once.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn invoke(&self, stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError>;
}

/// Maps the `executor:` references of a definition to implementations.
/// Compile-time resolution checks references against this registry.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    inner: BTreeMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, executor: Arc<dyn TaskExecutor>) {
        self.inner.insert(name.into(), executor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}
