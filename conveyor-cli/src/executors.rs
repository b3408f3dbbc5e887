//! Built-in task executors for local runs.
//!
//! These stand in for the remote compute behind each stage so a definition
//! can be exercised end-to-end on a workstation: the compression set mimics
//! the shape of the real stage outputs, the echo executor returns its
//! resolved input verbatim, and the fail injector manufactures classified
//! failures to exercise retry and catch policies.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use conveyor_core::types::{AnyValue, PipelineDefinition};
use conveyor_exec::{ExecutorRegistry, TaskError, TaskExecutor};
use serde_json::json;

/// Returns the resolved stage input unchanged; useful for dry-running a
/// definition's control flow and parameter bindings.
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        Ok(input.clone())
    }
}

struct InspectExecutor;

#[async_trait]
impl TaskExecutor for InspectExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        Ok(json!({
            "sourceBucket": input.get("sourceBucket").cloned().unwrap_or(AnyValue::Null),
            "sourceKey": input.get("sourceKey").cloned().unwrap_or(AnyValue::Null),
            "contentType": "application/octet-stream",
            "sizeBytes": 0,
        }))
    }
}

struct PrepareExecutor;

#[async_trait]
impl TaskExecutor for PrepareExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        let bucket = str_field(input, "artifactsBucket");
        let key = str_field(input, "sourceKey");
        Ok(json!({
            "artifactsBucket": bucket,
            "artifactKey": format!("artifacts/{key}.tar"),
        }))
    }
}

struct CompressExecutor;

#[async_trait]
impl TaskExecutor for CompressExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        let bucket = str_field(input, "artifactsBucket");
        let key = str_field(input, "artifactKey");
        let algorithm = input
            .get("compression")
            .and_then(|c| c.get("algorithm"))
            .and_then(AnyValue::as_str)
            .unwrap_or("gzip")
            .to_string();
        Ok(json!({
            "artifactsBucket": bucket,
            "compressedKey": format!("{key}.{algorithm}"),
            "algorithm": algorithm,
        }))
    }
}

struct StoreExecutor;

#[async_trait]
impl TaskExecutor for StoreExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        let output_bucket = str_field(input, "outputBucket");
        let compressed_key = str_field(input, "compressedKey");
        Ok(json!({
            "outputBucket": output_bucket,
            "outputKey": compressed_key,
        }))
    }
}

struct NotifyExecutor;

#[async_trait]
impl TaskExecutor for NotifyExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        let destination = str_field(input, "destination");
        let message = str_field(input, "message");
        println!("notify [{destination}]: {message}");
        Ok(json!({ "delivered": true, "destination": destination }))
    }
}

fn str_field(input: &AnyValue, name: &str) -> String {
    input
        .get(name)
        .and_then(AnyValue::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Fails a targeted stage with a classified error, optionally recovering
/// after a fixed number of attempts. Other stages pass through.
pub struct FailInjector {
    stage: String,
    classification: String,
    times: Option<u32>,
    seen: AtomicU32,
    inner: Arc<dyn TaskExecutor>,
}

#[async_trait]
impl TaskExecutor for FailInjector {
    async fn invoke(&self, stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        if stage == self.stage {
            let seen = self.seen.fetch_add(1, Ordering::SeqCst);
            let still_failing = match self.times {
                Some(times) => seen < times,
                None => true,
            };
            if still_failing {
                return Err(TaskError::new(
                    self.classification.clone(),
                    format!("injected failure at stage {stage}"),
                ));
            }
        }
        self.inner.invoke(stage, input).await
    }
}

/// Parse `STAGE=CLASSIFICATION[:TIMES]`.
pub fn parse_fail_spec(spec: &str) -> Result<(String, String, Option<u32>), String> {
    let (stage, rest) = spec
        .split_once('=')
        .ok_or_else(|| format!("invalid --fail spec `{spec}`: expected STAGE=CLASS[:N]"))?;
    let (classification, times) = match rest.split_once(':') {
        Some((class, n)) => {
            let times = n
                .parse::<u32>()
                .map_err(|_| format!("invalid --fail spec `{spec}`: `{n}` is not a count"))?;
            (class, Some(times))
        }
        None => (rest, None),
    };
    if stage.is_empty() || classification.is_empty() {
        return Err(format!("invalid --fail spec `{spec}`: expected STAGE=CLASS[:N]"));
    }
    Ok((stage.to_string(), classification.to_string(), times))
}

/// Build the registry for a local run: the simulated compression executors
/// under their canonical names, plus an echo executor for every other
/// reference the definition makes (or for all of them with `echo_all`).
pub fn build_registry(def: &PipelineDefinition, echo_all: bool) -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new();

    if !echo_all {
        registry.register("inspect-object", Arc::new(InspectExecutor));
        registry.register("prepare-artifact", Arc::new(PrepareExecutor));
        registry.register("extreme-compression", Arc::new(CompressExecutor));
        registry.register("store-final-object", Arc::new(StoreExecutor));
        registry.register("notify-user", Arc::new(NotifyExecutor));
    }

    for stage in &def.stages {
        if !registry.contains(&stage.executor) {
            registry.register(stage.executor.clone(), Arc::new(EchoExecutor));
        }
    }

    registry
}

/// Wrap the executors of the targeted stages with failure injection.
pub fn apply_fail_specs(
    registry: &mut ExecutorRegistry,
    def: &PipelineDefinition,
    specs: &[String],
) -> Result<(), String> {
    for spec in specs {
        let (stage_name, classification, times) = parse_fail_spec(spec)?;
        let stage = def
            .stage(&stage_name)
            .ok_or_else(|| format!("--fail targets unknown stage `{stage_name}`"))?;
        let inner = registry
            .get(&stage.executor)
            .ok_or_else(|| format!("no executor registered for stage `{stage_name}`"))?;
        registry.register(
            stage.executor.clone(),
            Arc::new(FailInjector {
                stage: stage_name,
                classification,
                times,
                seen: AtomicU32::new(0),
                inner,
            }),
        );
    }
    Ok(())
}
