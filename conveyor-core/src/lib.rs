#![forbid(unsafe_code)]

pub mod error;
pub mod expressions;
pub mod parser;
pub mod types;
pub mod validate;

pub use crate::error::{DefinitionError, ParseError, ValidationError, Violation, Warning};
pub use crate::parser::{parse_definition_str, DocumentFormat, ParsedDefinition};
pub use crate::types::PipelineDefinition;
pub use crate::validate::{validate_definition, Validate};

/// Parse and validate a definition in one step.
///
/// This is the startup path: a malformed or inconsistent definition fails
/// here and the pipeline never starts. On success the returned warnings are
/// advisory (e.g. a wildcard catch rule declared before the last position).
pub fn load_definition_str(
    input: &str,
    format: DocumentFormat,
) -> Result<(PipelineDefinition, Vec<Warning>), DefinitionError> {
    let parsed = parse_definition_str(input, format)?;
    let warnings = validate_definition(&parsed.definition)?;
    Ok((parsed.definition, warnings))
}
