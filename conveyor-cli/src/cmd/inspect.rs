use std::path::Path;

use conveyor_core::{load_definition_str, DocumentFormat};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::OutputArgs;

#[derive(Serialize)]
struct InspectResult {
    pipeline: String,
    #[serde(rename = "startAt")]
    start_at: String,
    stages: Vec<StageSummary>,
    #[serde(rename = "failStates", skip_serializing_if = "Vec::is_empty")]
    fail_states: Vec<String>,
}

#[derive(Serialize)]
struct StageSummary {
    stage: String,
    executor: String,
    #[serde(rename = "resultPath")]
    result_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    retry: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    catch: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

pub async fn inspect_cmd(path: &Path, output: OutputArgs) -> i32 {
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

    let (def, _) = match load_definition_str(&content, DocumentFormat::Auto) {
        Ok(v) => v,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let stages = def
        .stages
        .iter()
        .map(|s| StageSummary {
            stage: s.name.clone(),
            executor: s.executor.clone(),
            result_path: s.result_path.clone(),
            retry: s
                .retry
                .iter()
                .map(|r| {
                    format!(
                        "{} x{} @{}s *{}",
                        r.error_equals.join("|"),
                        r.max_attempts,
                        r.interval_seconds,
                        r.backoff_rate
                    )
                })
                .collect(),
            catch: s
                .catch
                .iter()
                .map(|c| format!("{} -> {}", c.error_equals.join("|"), c.next))
                .collect(),
            next: s.next.clone(),
        })
        .collect();

    print_result(
        output.format,
        output.quiet,
        &InspectResult {
            pipeline: def.name.clone(),
            start_at: def.start_at.clone(),
            stages,
            fail_states: def.fail_states.iter().map(|f| f.name.clone()).collect(),
        },
    );
    exit_codes::SUCCESS
}
