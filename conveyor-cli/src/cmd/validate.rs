use std::path::Path;

use conveyor_core::{parse_definition_str, DocumentFormat, Validate};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    pipeline: String,
    stages: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
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

    let parsed = match parse_definition_str(&content, DocumentFormat::Auto) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("{e}"));
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let format = match parsed.format {
        DocumentFormat::Json => "json",
        DocumentFormat::Yaml => "yaml",
        DocumentFormat::Auto => "auto",
    };

    match parsed.definition.validate() {
        Ok(warnings) => {
            print_result(
                output.format,
                output.quiet,
                &ValidateResult {
                    valid: true,
                    format: format.to_string(),
                    pipeline: parsed.definition.name.clone(),
                    stages: parsed.definition.stages.len(),
                    errors: Vec::new(),
                    warnings: warnings
                        .iter()
                        .map(|w| format!("{}: {}", w.path, w.message))
                        .collect(),
                },
            );
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_result(
                output.format,
                output.quiet,
                &ValidateResult {
                    valid: false,
                    format: format.to_string(),
                    pipeline: parsed.definition.name.clone(),
                    stages: parsed.definition.stages.len(),
                    errors: e
                        .violations
                        .iter()
                        .map(|v| format!("{}: {}", v.path, v.message))
                        .collect(),
                    warnings: Vec::new(),
                },
            );
            exit_codes::VALIDATION_FAILED
        }
    }
}
