//! Turns a validated [`PipelineDefinition`] into the immutable form the
//! orchestrator interprets: parameter values classified into typed bindings,
//! state names resolved to references, result paths reduced to their single
//! key, and every executor reference checked against the registry.

use conveyor_core::error::{DefinitionError, ValidationError, Violation};
use conveyor_core::expressions::{classify_parameters, Binding, DocPath};
use conveyor_core::types::{PipelineDefinition, RetryRule};
use conveyor_core::validate::Validate;

use crate::engine::ExecutorRegistry;

/// Resolved reference to a state in the compiled pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRef {
    Stage(usize),
    Fail(usize),
}

#[derive(Debug, Clone)]
pub struct CompiledPipeline {
    pub name: String,
    pub start: StateRef,
    pub stages: Vec<CompiledStage>,
    pub fail_states: Vec<CompiledFailState>,
    /// Target for errors no catch rule intercepts.
    pub default_fail: usize,
}

#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub name: String,
    pub executor: String,
    pub parameters: Vec<(String, Binding)>,
    pub result_key: String,
    pub retry: Vec<RetryRule>,
    pub catch: Vec<CompiledCatch>,
    pub next: Option<StateRef>,
}

#[derive(Debug, Clone)]
pub struct CompiledCatch {
    pub error_equals: Vec<String>,
    pub result_key: String,
    pub next: StateRef,
}

impl CompiledCatch {
    pub fn matches(&self, classification: &str) -> bool {
        self.error_equals
            .iter()
            .any(|c| c == conveyor_core::types::WILDCARD || c == classification)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledFailState {
    pub name: String,
    pub error: String,
    pub cause: Option<String>,
}

impl CompiledPipeline {
    pub fn stage_named(&self, name: &str) -> Option<&CompiledStage> {
        self.stages.iter().find(|s| s.name == name)
    }
}

pub fn compile(
    def: &PipelineDefinition,
    registry: &ExecutorRegistry,
) -> Result<CompiledPipeline, DefinitionError> {
    // Compilation assumes a structurally valid document; re-validate so a
    // definition can never be interpreted without having passed the checks.
    def.validate()?;

    let mut violations = Vec::new();
    for (idx, stage) in def.stages.iter().enumerate() {
        if !registry.contains(&stage.executor) {
            violations.push(Violation::new(
                format!("$.stages[{idx}].executor"),
                format!("no task executor registered under `{}`", stage.executor),
            ));
        }
    }
    if !violations.is_empty() {
        return Err(ValidationError::new(violations).into());
    }

    let mut fail_states: Vec<CompiledFailState> = def
        .fail_states
        .iter()
        .map(|f| CompiledFailState {
            name: f.name.clone(),
            error: f.error.clone(),
            cause: f.cause.clone(),
        })
        .collect();

    // Default fail state: `onError` if named, else the first declared, else
    // a synthesized terminal so uncaught errors always have somewhere to go.
    let default_fail = match &def.on_error {
        Some(name) => fail_states
            .iter()
            .position(|f| &f.name == name)
            .expect("validated onError reference"),
        None => {
            if fail_states.is_empty() {
                fail_states.push(CompiledFailState {
                    name: "Failed".to_string(),
                    error: "PipelineFailed".to_string(),
                    cause: None,
                });
            }
            0
        }
    };

    let resolve = |name: &str| -> StateRef {
        if let Some(i) = def.stages.iter().position(|s| s.name == name) {
            StateRef::Stage(i)
        } else {
            let i = fail_states
                .iter()
                .position(|f| f.name == name)
                .expect("validated state reference");
            StateRef::Fail(i)
        }
    };

    let mut stages = Vec::with_capacity(def.stages.len());
    for stage in &def.stages {
        let parameters = classify_parameters(stage.parameters.iter())
            .expect("validated parameter expressions");
        let result_key = top_level_key(&stage.result_path);

        let catch = stage
            .catch
            .iter()
            .map(|c| CompiledCatch {
                error_equals: c.error_equals.clone(),
                result_key: top_level_key(&c.result_path),
                next: resolve(&c.next),
            })
            .collect();

        stages.push(CompiledStage {
            name: stage.name.clone(),
            executor: stage.executor.clone(),
            parameters,
            result_key,
            retry: stage.retry.clone(),
            catch,
            next: stage.next.as_deref().map(resolve),
        });
    }

    Ok(CompiledPipeline {
        name: def.name.clone(),
        start: resolve(&def.start_at),
        stages,
        fail_states,
        default_fail,
    })
}

fn top_level_key(result_path: &str) -> String {
    DocPath::parse(result_path)
        .ok()
        .and_then(|p| p.as_top_level_key().map(str::to_string))
        .expect("validated result path")
}
