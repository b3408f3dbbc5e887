use crate::error::ParseError;
use crate::types::PipelineDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedDefinition {
    pub definition: PipelineDefinition,
    pub format: DocumentFormat,
}

pub fn parse_definition_str(
    input: &str,
    format: DocumentFormat,
) -> Result<ParsedDefinition, ParseError> {
    match format {
        DocumentFormat::Json => Ok(ParsedDefinition {
            definition: serde_json::from_str::<PipelineDefinition>(input)?,
            format,
        }),
        DocumentFormat::Yaml => Ok(ParsedDefinition {
            definition: serde_yaml::from_str::<PipelineDefinition>(input)?,
            format,
        }),
        DocumentFormat::Auto => parse_definition_auto(input),
    }
}

fn parse_definition_auto(input: &str) -> Result<ParsedDefinition, ParseError> {
    // Heuristic: JSON always starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<PipelineDefinition>(input) {
            Ok(definition) => Ok(ParsedDefinition {
                definition,
                format: DocumentFormat::Json,
            }),
            Err(json_err) => match serde_yaml::from_str::<PipelineDefinition>(input) {
                // YAML is a JSON superset, so this fallback rarely fires, but
                // it keeps hand-edited JSON-with-comments definitions loadable.
                Ok(definition) => Ok(ParsedDefinition {
                    definition,
                    format: DocumentFormat::Yaml,
                }),
                Err(_) => Err(ParseError::Json(json_err)),
            },
        };
    }

    match serde_yaml::from_str::<PipelineDefinition>(input) {
        Ok(definition) => Ok(ParsedDefinition {
            definition,
            format: DocumentFormat::Yaml,
        }),
        Err(yaml_err) => {
            if let Ok(definition) = serde_json::from_str::<PipelineDefinition>(input) {
                return Ok(ParsedDefinition {
                    definition,
                    format: DocumentFormat::Json,
                });
            }
            Err(ParseError::Yaml(yaml_err))
        }
    }
}
