mod common;
mod document;
mod policy;
mod state;

pub use common::AnyValue;
pub use document::PipelineDefinition;
pub use policy::{CatchRule, RetryRule, WILDCARD};
pub use state::{FailStateDef, StageDef};
