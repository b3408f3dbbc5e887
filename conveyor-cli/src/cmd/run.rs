use std::path::Path;
use std::sync::Arc;

use conveyor_core::{load_definition_str, DocumentFormat};
use conveyor_exec::{
    compile, CancelToken, EventSink, NoOpEventSink, Orchestrator, RunStatus, StdoutEventSink,
    TriggerEvent,
};

use crate::executors::{apply_fail_specs, build_registry};
use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::{OutputArgs, RunBehaviorArgs, TriggerArgs};

pub async fn run_cmd(
    path: &Path,
    trigger: TriggerArgs,
    behavior: RunBehaviorArgs,
    output: OutputArgs,
) -> i32 {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let (def, warnings) = match load_definition_str(&content, DocumentFormat::Auto) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };
    if !output.quiet {
        for w in &warnings {
            eprintln!("warning: {}: {}", w.path, w.message);
        }
    }

    let event = match load_trigger(&trigger) {
        Ok(e) => e,
        Err(msg) => {
            print_error(output.format, output.quiet, &msg);
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let mut registry = build_registry(&def, behavior.echo);
    if let Err(msg) = apply_fail_specs(&mut registry, &def, &behavior.fail) {
        print_error(output.format, output.quiet, &msg);
        return exit_codes::RUNTIME_ERROR;
    }

    let compiled = match compile(&def, &registry) {
        Ok(c) => c,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let sink: Arc<dyn EventSink> = if output.quiet {
        Arc::new(NoOpEventSink)
    } else {
        Arc::new(StdoutEventSink)
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let orchestrator = Orchestrator::new(Arc::new(registry), sink);
    match orchestrator.run(&compiled, event, cancel).await {
        Ok(record) => {
            let status = record.status;
            print_result(output.format, output.quiet, &record);
            match status {
                RunStatus::Succeeded => exit_codes::SUCCESS,
                _ => exit_codes::RUN_FAILED,
            }
        }
        Err(violation) => {
            print_error(output.format, output.quiet, &format!("{violation}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}

fn load_trigger(args: &TriggerArgs) -> Result<TriggerEvent, String> {
    if let Some(path) = &args.event {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        return serde_json::from_str::<TriggerEvent>(&content)
            .map_err(|e| format!("invalid trigger event: {e}"));
    }
    match (&args.source_bucket, &args.source_key) {
        (Some(bucket), Some(key)) => Ok(TriggerEvent {
            source_bucket: bucket.clone(),
            source_key: key.clone(),
        }),
        _ => Err("either --event FILE or both --source-bucket and --source-key are required"
            .to_string()),
    }
}
