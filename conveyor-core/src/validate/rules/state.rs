use std::collections::HashSet;

use crate::expressions::{Binding, DocPath};
use crate::types::StageDef;
use crate::validate::rules::policy;
use crate::validate::validator::Validator;

pub(crate) fn validate_stage(
    v: &mut Validator,
    stage: &StageDef,
    path: &str,
    stage_names: &HashSet<&str>,
    fail_names: &HashSet<&str>,
) {
    v.validate_id(&format!("{path}.stage"), &stage.name);
    v.validate_id(&format!("{path}.executor"), &stage.executor);

    for (name, value) in &stage.parameters {
        if let Err(e) = Binding::classify(value) {
            v.push(format!("{path}.parameters.{name}"), e.to_string());
        }
    }

    validate_result_path(v, &format!("{path}.resultPath"), &stage.result_path);

    if let Some(next) = &stage.next {
        if !stage_names.contains(next.as_str()) && !fail_names.contains(next.as_str()) {
            v.push(
                format!("{path}.next"),
                format!("must name a defined state, got: {next}"),
            );
        }
    }

    policy::validate_retry_rules(v, &format!("{path}.retry"), &stage.retry);
    policy::validate_catch_rules(
        v,
        &format!("{path}.catch"),
        &stage.catch,
        stage_names,
        fail_names,
    );
}

pub(crate) fn validate_result_path(v: &mut Validator, path: &str, result_path: &str) {
    match DocPath::parse(result_path) {
        Ok(p) => {
            if p.as_top_level_key().is_none() {
                v.push(
                    path,
                    "must be a single top-level key (stages merge exactly one new root key)",
                );
            }
        }
        Err(e) => v.push(path, e.to_string()),
    }
}
