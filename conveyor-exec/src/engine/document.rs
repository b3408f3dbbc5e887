use conveyor_core::expressions::{Binding, DocPath, Segment, Template};
use conveyor_core::types::AnyValue;
use serde_json::{Map, Value};

use crate::engine::record::TriggerEvent;

/// The run-level JSON record threaded through all stages.
///
/// Append-only at the top level: each stage merge writes exactly one new
/// root key, and a key once written is immutable for the remainder of the
/// execution. The trigger payload seeds the root and is protected by the
/// same rule.
#[derive(Debug, Clone)]
pub struct ExecutionDocument {
    root: Map<String, Value>,
}

impl ExecutionDocument {
    pub fn seed(trigger: &TriggerEvent) -> Self {
        let mut root = Map::new();
        root.insert(
            "sourceBucket".to_string(),
            Value::String(trigger.source_bucket.clone()),
        );
        root.insert(
            "sourceKey".to_string(),
            Value::String(trigger.source_key.clone()),
        );
        Self { root }
    }

    /// Merge a stage result under its result key.
    ///
    /// A collision with an existing key is a defect in the definition or the
    /// engine, never a user-level stage error; it fails loudly and is not
    /// eligible for retry or catch.
    pub fn merge(&mut self, key: &str, value: Value) -> Result<(), InvariantViolation> {
        if self.root.contains_key(key) {
            return Err(InvariantViolation::DuplicateResultKey {
                key: key.to_string(),
            });
        }
        self.root.insert(key.to_string(), value);
        Ok(())
    }

    pub fn resolve(&self, path: &DocPath) -> Result<&Value, PathResolutionError> {
        let mut segments = path.segments().iter();
        let first = segments.next().ok_or_else(|| PathResolutionError {
            path: path.to_string(),
            missing: String::new(),
        })?;
        let mut current = self.root.get(first).ok_or_else(|| PathResolutionError {
            path: path.to_string(),
            missing: first.clone(),
        })?;
        for seg in segments {
            current = current.get(seg).ok_or_else(|| PathResolutionError {
                path: path.to_string(),
                missing: seg.clone(),
            })?;
        }
        Ok(current)
    }

    pub fn render_template(&self, template: &Template) -> Result<String, PathResolutionError> {
        let mut out = String::new();
        for seg in &template.segments {
            match seg {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Path(path) => match self.resolve(path)? {
                    Value::String(s) => out.push_str(s),
                    Value::Number(n) => out.push_str(&n.to_string()),
                    Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
                    Value::Null => {}
                    other => out.push_str(&other.to_string()),
                },
            }
        }
        Ok(out)
    }

    pub fn resolve_binding(&self, binding: &Binding) -> Result<Value, PathResolutionError> {
        match binding {
            Binding::Literal(value) => Ok(value.clone()),
            Binding::Path(path) => self.resolve(path).cloned(),
            Binding::Template(template) => {
                Ok(Value::String(self.render_template(template)?))
            }
            Binding::Object(fields) => {
                let mut out = Map::new();
                for (name, b) in fields {
                    out.insert(name.clone(), self.resolve_binding(b)?);
                }
                Ok(Value::Object(out))
            }
            Binding::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for b in items {
                    out.push(self.resolve_binding(b)?);
                }
                Ok(Value::Array(out))
            }
        }
    }

    /// Evaluate a stage's full parameter template into its input document.
    pub fn resolve_parameters(
        &self,
        parameters: &[(String, Binding)],
    ) -> Result<AnyValue, PathResolutionError> {
        let mut out = Map::new();
        for (name, binding) in parameters {
            out.insert(name.clone(), self.resolve_binding(binding)?);
        }
        Ok(Value::Object(out))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    pub fn into_value(self) -> AnyValue {
        Value::Object(self.root)
    }

    pub fn as_value(&self) -> AnyValue {
        Value::Object(self.root.clone())
    }
}

/// A parameter template addressed a document path that does not exist at
/// invocation time. Flows into retry/catch like any executor error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path {path} does not resolve: missing key `{missing}`")]
pub struct PathResolutionError {
    pub path: String,
    pub missing: String,
}

/// Internal invariant breach. Always fatal, never retried, and the only
/// error besides a definition error that escapes a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("result key `{key}` was already written; stage results are append-only")]
    DuplicateResultKey { key: String },
    #[error("executor `{name}` is not registered; pipeline was compiled against a different registry")]
    ExecutorNotRegistered { name: String },
}
