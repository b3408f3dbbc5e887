mod rules;
mod validator;

use crate::error::{ValidationError, Warning};
use crate::types::PipelineDefinition;
use validator::Validator;

pub trait Validate {
    fn validate(&self) -> Result<Vec<Warning>, ValidationError>;
}

impl Validate for PipelineDefinition {
    fn validate(&self) -> Result<Vec<Warning>, ValidationError> {
        validate_definition(self)
    }
}

pub fn validate_definition(def: &PipelineDefinition) -> Result<Vec<Warning>, ValidationError> {
    let mut v = Validator::new();
    v.validate_definition(def);
    v.finish()
}
