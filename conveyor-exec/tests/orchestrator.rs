use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::types::AnyValue;
use conveyor_core::{load_definition_str, DocumentFormat};
use conveyor_exec::{
    compile, CancelToken, Event, EventSink, ExecutorRegistry, InvariantViolation, Orchestrator,
    RunStatus, TaskError, TaskExecutor, TriggerEvent,
};
use serde_json::json;

struct StaticExecutor {
    output: AnyValue,
    calls: AtomicU32,
}

impl StaticExecutor {
    fn new(output: AnyValue) -> Arc<Self> {
        Arc::new(Self {
            output,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for StaticExecutor {
    async fn invoke(&self, _stage: &str, _input: &AnyValue) -> Result<AnyValue, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

struct FailingExecutor {
    classification: String,
    calls: AtomicU32,
}

impl FailingExecutor {
    fn new(classification: &str) -> Arc<Self> {
        Arc::new(Self {
            classification: classification.to_string(),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for FailingExecutor {
    async fn invoke(&self, stage: &str, _input: &AnyValue) -> Result<AnyValue, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TaskError::new(
            self.classification.clone(),
            format!("stage {stage} rejected the input"),
        ))
    }
}

/// Fails a fixed number of times with the given classification, then
/// succeeds with the given output.
struct FlakyExecutor {
    failures: u32,
    classification: String,
    output: AnyValue,
    calls: AtomicU32,
}

impl FlakyExecutor {
    fn new(failures: u32, classification: &str, output: AnyValue) -> Arc<Self> {
        Arc::new(Self {
            failures,
            classification: classification.to_string(),
            output,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for FlakyExecutor {
    async fn invoke(&self, _stage: &str, _input: &AnyValue) -> Result<AnyValue, TaskError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(TaskError::new(self.classification.clone(), "not yet"))
        } else {
            Ok(self.output.clone())
        }
    }
}

/// Records every input it is invoked with.
struct RecordingExecutor {
    output: AnyValue,
    inputs: Mutex<Vec<AnyValue>>,
}

impl RecordingExecutor {
    fn new(output: AnyValue) -> Arc<Self> {
        Arc::new(Self {
            output,
            inputs: Mutex::new(Vec::new()),
        })
    }

    fn inputs(&self) -> Vec<AnyValue> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskExecutor for RecordingExecutor {
    async fn invoke(&self, _stage: &str, input: &AnyValue) -> Result<AnyValue, TaskError> {
        self.inputs.lock().unwrap().push(input.clone());
        Ok(self.output.clone())
    }
}

/// Never returns; the run can only leave this stage through cancellation.
struct HangingExecutor;

#[async_trait]
impl TaskExecutor for HangingExecutor {
    async fn invoke(&self, _stage: &str, _input: &AnyValue) -> Result<AnyValue, TaskError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn retry_delays(&self) -> Vec<Duration> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                Event::RetryScheduled { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

fn trigger() -> TriggerEvent {
    TriggerEvent {
        source_bucket: "in".to_string(),
        source_key: "f.bin".to_string(),
    }
}

fn load(yaml: &str) -> conveyor_core::PipelineDefinition {
    load_definition_str(yaml, DocumentFormat::Yaml).unwrap().0
}

fn orchestrator(registry: &ExecutorRegistry, sink: Arc<dyn EventSink>) -> Orchestrator {
    Orchestrator::new(Arc::new(registry.clone()), sink)
}

fn compression_pipeline_yaml() -> &'static str {
    r#"
conveyor: "1.0"
name: compression-pipeline
startAt: InspectObject
stages:
  - stage: InspectObject
    executor: inspect-object
    parameters:
      sourceBucket: "$.sourceBucket"
      sourceKey: "$.sourceKey"
    resultPath: "$.inspect"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 2
        maxAttempts: 3
    catch:
      - errorEquals: ["*"]
        resultPath: "$.error"
        next: FailState
    next: PrepareArtifact
  - stage: PrepareArtifact
    executor: prepare-artifact
    parameters:
      sourceBucket: "$.sourceBucket"
      sourceKey: "$.sourceKey"
      artifactsBucket: conveyor-artifacts
    resultPath: "$.prepared"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 2
        maxAttempts: 3
    catch:
      - errorEquals: ["*"]
        resultPath: "$.error"
        next: FailState
    next: ExtremeCompression
  - stage: ExtremeCompression
    executor: extreme-compression
    parameters:
      artifactsBucket: "$.prepared.artifactsBucket"
      artifactKey: "$.prepared.artifactKey"
      compression:
        algorithm: gzip
        level: 9
    resultPath: "$.compressed"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 2
        maxAttempts: 2
    catch:
      - errorEquals: ["*"]
        resultPath: "$.error"
        next: FailState
    next: StoreFinalObject
  - stage: StoreFinalObject
    executor: store-final-object
    parameters:
      artifactsBucket: "$.compressed.artifactsBucket"
      compressedKey: "$.compressed.compressedKey"
      outputBucket: conveyor-output
    resultPath: "$.stored"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 2
        maxAttempts: 3
    catch:
      - errorEquals: ["*"]
        resultPath: "$.error"
        next: FailState
    next: NotifyUser
  - stage: NotifyUser
    executor: notify-user
    parameters:
      destination: compression-events
      message: "Compression complete for {$.sourceKey}"
      details: "$.stored"
    resultPath: "$.notified"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 2
        maxAttempts: 2
    catch:
      - errorEquals: ["*"]
        resultPath: "$.error"
        next: FailState
failStates:
  - name: FailState
    error: CompressionFailed
    cause: Pipeline failure
onError: FailState
"#
}

struct CompressionFixture {
    registry: ExecutorRegistry,
    inspect: Arc<StaticExecutor>,
    prepare: Arc<StaticExecutor>,
    compress: Arc<StaticExecutor>,
    store: Arc<StaticExecutor>,
    notify: Arc<RecordingExecutor>,
}

fn compression_fixture() -> CompressionFixture {
    let inspect = StaticExecutor::new(json!({
        "contentType": "application/octet-stream",
        "sizeBytes": 1024
    }));
    let prepare = StaticExecutor::new(json!({
        "artifactsBucket": "conveyor-artifacts",
        "artifactKey": "artifacts/f.bin.tar"
    }));
    let compress = StaticExecutor::new(json!({
        "artifactsBucket": "conveyor-artifacts",
        "compressedKey": "artifacts/f.bin.tar.gz"
    }));
    let store = StaticExecutor::new(json!({
        "outputBucket": "conveyor-output",
        "outputKey": "f.bin.gz"
    }));
    let notify = RecordingExecutor::new(json!({ "delivered": true }));

    let mut registry = ExecutorRegistry::new();
    registry.register("inspect-object", inspect.clone());
    registry.register("prepare-artifact", prepare.clone());
    registry.register("extreme-compression", compress.clone());
    registry.register("store-final-object", store.clone());
    registry.register("notify-user", notify.clone());

    CompressionFixture {
        registry,
        inspect,
        prepare,
        compress,
        store,
        notify,
    }
}

#[tokio::test]
async fn full_pipeline_succeeds_and_accumulates_results() {
    let fixture = compression_fixture();
    let def = load(compression_pipeline_yaml());
    let compiled = compile(&def, &fixture.registry).unwrap();

    let orch = orchestrator(&fixture.registry, Arc::new(RecordingSink::default()));
    let record = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, RunStatus::Succeeded);
    assert_eq!(record.final_state, "NotifyUser");
    assert!(record.error.is_none());

    let doc = record.document.as_object().unwrap();
    for key in ["inspect", "prepared", "compressed", "stored", "notified"] {
        assert!(doc.contains_key(key), "missing document key {key}");
    }

    // Each stage ran exactly once.
    assert_eq!(fixture.inspect.calls(), 1);
    assert_eq!(fixture.prepare.calls(), 1);
    assert_eq!(fixture.compress.calls(), 1);
    assert_eq!(fixture.store.calls(), 1);

    // The notifier received the templated message and the stored details.
    let inputs = fixture.notify.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(
        inputs[0],
        json!({
            "destination": "compression-events",
            "message": "Compression complete for f.bin",
            "details": { "outputBucket": "conveyor-output", "outputKey": "f.bin.gz" }
        })
    );
}

#[tokio::test]
async fn terminal_error_is_caught_and_halts_the_pipeline() {
    let fixture = compression_fixture();
    let failing = FailingExecutor::new("InvalidFormat");
    let mut registry = fixture.registry.clone();
    registry.register("prepare-artifact", failing.clone());

    let def = load(compression_pipeline_yaml());
    let compiled = compile(&def, &registry).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(&registry, sink.clone());
    let record = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.final_state, "FailState");

    // Not in any retry rule: exactly one attempt, no backoff.
    assert_eq!(failing.calls(), 1);

    let doc = record.document.as_object().unwrap();
    let error = doc.get("error").unwrap();
    assert_eq!(error.get("errorType").unwrap(), "InvalidFormat");

    // Later stages never ran.
    assert_eq!(fixture.compress.calls(), 0);
    assert_eq!(fixture.store.calls(), 0);
    assert!(fixture.notify.inputs().is_empty());

    // The terminal event carries the failure detail for operators.
    let events = sink.events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::RunFinished { status: RunStatus::Failed, error: Some(err), .. }
            if err.error_type == "InvalidFormat"
    )));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_then_succeed() {
    let fixture = compression_fixture();
    let flaky = FlakyExecutor::new(
        2,
        "Transient",
        json!({
            "artifactsBucket": "conveyor-artifacts",
            "compressedKey": "artifacts/f.bin.tar.gz"
        }),
    );
    let mut registry = fixture.registry.clone();
    registry.register("extreme-compression", flaky.clone());

    let def = load(compression_pipeline_yaml());
    let compiled = compile(&def, &registry).unwrap();

    let orch = orchestrator(&registry, Arc::new(RecordingSink::default()));
    let record = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap();

    // maxAttempts 2 allows exactly two retries: three invocations total.
    assert_eq!(record.status, RunStatus::Succeeded);
    assert_eq!(flaky.calls(), 3);
    assert_eq!(fixture.store.calls(), 1);

    // The retried result was merged exactly once.
    let doc = record.document.as_object().unwrap();
    assert_eq!(
        doc.get("compressed").unwrap().get("compressedKey").unwrap(),
        "artifacts/f.bin.tar.gz"
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_grow_exponentially() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: always-fails
    resultPath: "$.a"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 2
        maxAttempts: 3
        backoffRate: 2.0
"#;
    let failing = FailingExecutor::new("Transient");
    let mut registry = ExecutorRegistry::new();
    registry.register("always-fails", failing.clone());

    let def = load(doc);
    let compiled = compile(&def, &registry).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let orch = orchestrator(&registry, sink.clone());
    let record = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(failing.calls(), 4); // initial attempt + maxAttempts retries
    assert_eq!(
        sink.retry_delays(),
        [
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8)
        ]
    );
}

#[tokio::test]
async fn catch_rules_are_evaluated_in_declared_order() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: fails
    resultPath: "$.a"
    catch:
      - errorEquals: [A]
        next: KnownFailure
      - errorEquals: ["*"]
        next: UnknownFailure
failStates:
  - name: KnownFailure
    error: Known
  - name: UnknownFailure
    error: Unknown
"#;
    let def = load(doc);

    for (classification, expected_state) in [("A", "KnownFailure"), ("B", "UnknownFailure")] {
        let failing = FailingExecutor::new(classification);
        let mut registry = ExecutorRegistry::new();
        registry.register("fails", failing.clone());
        let compiled = compile(&def, &registry).unwrap();

        let orch = orchestrator(&registry, Arc::new(RecordingSink::default()));
        let record = orch
            .run(&compiled, trigger(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.final_state, expected_state);
    }
}

#[tokio::test]
async fn uncaught_error_routes_to_default_fail_with_diagnostic_key() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: fails
    resultPath: "$.a"
"#;
    let failing = FailingExecutor::new("Boom");
    let mut registry = ExecutorRegistry::new();
    registry.register("fails", failing.clone());

    let def = load(doc);
    let compiled = compile(&def, &registry).unwrap();

    let orch = orchestrator(&registry, Arc::new(RecordingSink::default()));
    let record = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.final_state, "Failed");
    let error = record.document.get("error").unwrap();
    assert_eq!(error.get("errorType").unwrap(), "Boom");
}

#[tokio::test]
async fn unresolvable_parameter_flows_into_catch() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: echo
    parameters:
      missing: "$.never.written"
    resultPath: "$.a"
    catch:
      - errorEquals: [PathResolutionError]
        next: BadBinding
failStates:
  - name: BadBinding
    error: BindingFailed
"#;
    let echo = StaticExecutor::new(json!({}));
    let mut registry = ExecutorRegistry::new();
    registry.register("echo", echo.clone());

    let def = load(doc);
    let compiled = compile(&def, &registry).unwrap();

    let orch = orchestrator(&registry, Arc::new(RecordingSink::default()));
    let record = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap();

    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.final_state, "BadBinding");
    // The executor was never invoked: resolution failed before the call.
    assert_eq!(echo.calls(), 0);
    let error = record.document.get("error").unwrap();
    assert_eq!(error.get("errorType").unwrap(), "PathResolutionError");
}

#[tokio::test]
async fn duplicate_result_key_is_an_invariant_violation() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: echo
    resultPath: "$.dup"
    next: B
  - stage: B
    executor: echo
    resultPath: "$.dup"
"#;
    let echo = StaticExecutor::new(json!({}));
    let mut registry = ExecutorRegistry::new();
    registry.register("echo", echo.clone());

    let def = load(doc);
    let compiled = compile(&def, &registry).unwrap();

    let orch = orchestrator(&registry, Arc::new(RecordingSink::default()));
    let err = orch
        .run(&compiled, trigger(), CancelToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        InvariantViolation::DuplicateResultKey {
            key: "dup".to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_invocation_fails_the_run() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: hangs
    resultPath: "$.a"
"#;
    let mut registry = ExecutorRegistry::new();
    registry.register("hangs", Arc::new(HangingExecutor));

    let def = load(doc);
    let compiled = Arc::new(compile(&def, &registry).unwrap());

    let orch = Arc::new(orchestrator(&registry, Arc::new(RecordingSink::default())));
    let cancel = CancelToken::new();

    let run = {
        let orch = orch.clone();
        let compiled = compiled.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orch.run(&compiled, trigger(), cancel).await })
    };

    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    cancel.cancel();

    let record = run.await.unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.final_state, "A");
    assert_eq!(
        record.error.unwrap().error_type,
        "CancellationError"
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_makes_no_further_attempts() {
    let doc = r#"
conveyor: "1.0"
name: p
startAt: A
stages:
  - stage: A
    executor: flaky
    resultPath: "$.a"
    retry:
      - errorEquals: [Transient]
        intervalSeconds: 3600
        maxAttempts: 3
"#;
    let failing = FailingExecutor::new("Transient");
    let mut registry = ExecutorRegistry::new();
    registry.register("flaky", failing.clone());

    let def = load(doc);
    let compiled = Arc::new(compile(&def, &registry).unwrap());

    let orch = Arc::new(orchestrator(&registry, Arc::new(RecordingSink::default())));
    let cancel = CancelToken::new();

    let run = {
        let orch = orch.clone();
        let compiled = compiled.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orch.run(&compiled, trigger(), cancel).await })
    };

    // Let the run reach its backoff sleep, then abort it.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    cancel.cancel();

    let record = run.await.unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert_eq!(record.error.unwrap().error_type, "CancellationError");
    assert_eq!(failing.calls(), 1);
}
