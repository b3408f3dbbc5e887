use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ValidationError, Violation, Warning};
use crate::types::PipelineDefinition;

use super::rules;

pub(crate) static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid regex"));

pub struct Validator {
    violations: Vec<Violation>,
    warnings: Vec<Warning>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<Vec<Warning>, ValidationError> {
        if self.violations.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    pub fn validate_definition(&mut self, def: &PipelineDefinition) {
        rules::document::validate_definition(self, def);
    }

    pub(crate) fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Warning::new(path, message));
    }

    pub(crate) fn validate_version(&mut self, path: &str, version: &str) {
        // Documents with the same major.minor share a feature set; we accept 1.0.x.
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() < 2 {
            self.push(path, "must be a semver-like string (major.minor[.patch])");
            return;
        }
        if parts[0] != "1" || parts[1] != "0" {
            self.push(path, "only Conveyor definition version 1.0.x is supported");
        }
    }

    pub(crate) fn validate_id(&mut self, path: &str, id: &str) {
        if !ID_RE.is_match(id) {
            self.push(
                path,
                "must match [A-Za-z0-9_-]+ (no spaces or punctuation)",
            );
        }
    }
}
