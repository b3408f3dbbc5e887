use std::collections::HashSet;

use crate::types::PipelineDefinition;
use crate::validate::rules::{graph, state};
use crate::validate::validator::Validator;

pub(crate) fn validate_definition(v: &mut Validator, def: &PipelineDefinition) {
    v.validate_version("$.conveyor", &def.conveyor);
    v.validate_id("$.name", &def.name);

    if def.stages.is_empty() {
        v.push("$.stages", "must declare at least one stage");
        return;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (idx, stage) in def.stages.iter().enumerate() {
        if !seen.insert(stage.name.as_str()) {
            v.push(
                format!("$.stages[{idx}].stage"),
                format!("duplicate state name: {}", stage.name),
            );
        }
    }
    for (idx, fail) in def.fail_states.iter().enumerate() {
        v.validate_id(&format!("$.failStates[{idx}].name"), &fail.name);
        if fail.error.trim().is_empty() {
            v.push(format!("$.failStates[{idx}].error"), "must not be empty");
        }
        if !seen.insert(fail.name.as_str()) {
            v.push(
                format!("$.failStates[{idx}].name"),
                format!("duplicate state name: {}", fail.name),
            );
        }
    }

    let stage_names: HashSet<&str> = def.stages.iter().map(|s| s.name.as_str()).collect();
    let fail_names: HashSet<&str> = def.fail_states.iter().map(|f| f.name.as_str()).collect();

    if !stage_names.contains(def.start_at.as_str()) {
        v.push(
            "$.startAt",
            format!("must name a defined task stage, got: {}", def.start_at),
        );
    }

    if let Some(on_error) = &def.on_error {
        if !fail_names.contains(on_error.as_str()) {
            v.push(
                "$.onError",
                format!("must name a declared fail state, got: {on_error}"),
            );
        }
    }

    for (idx, stage) in def.stages.iter().enumerate() {
        state::validate_stage(
            v,
            stage,
            &format!("$.stages[{idx}]"),
            &stage_names,
            &fail_names,
        );
    }

    graph::validate_flow_graph(v, def, &stage_names);
}
