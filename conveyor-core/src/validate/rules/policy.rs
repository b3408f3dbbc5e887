use std::collections::HashSet;

use crate::types::{CatchRule, RetryRule, WILDCARD};
use crate::validate::rules::state::validate_result_path;
use crate::validate::validator::Validator;

pub(crate) fn validate_retry_rules(v: &mut Validator, path: &str, rules: &[RetryRule]) {
    for (idx, rule) in rules.iter().enumerate() {
        let rpath = format!("{path}[{idx}]");
        if rule.error_equals.is_empty() {
            v.push(format!("{rpath}.errorEquals"), "must not be empty");
        }
        if rule.interval_seconds == 0 {
            v.push(format!("{rpath}.intervalSeconds"), "must be at least 1");
        }
        if rule.backoff_rate < 1.0 {
            v.push(format!("{rpath}.backoffRate"), "must be at least 1.0");
        }
    }
}

pub(crate) fn validate_catch_rules(
    v: &mut Validator,
    path: &str,
    rules: &[CatchRule],
    stage_names: &HashSet<&str>,
    fail_names: &HashSet<&str>,
) {
    for (idx, rule) in rules.iter().enumerate() {
        let rpath = format!("{path}[{idx}]");
        if rule.error_equals.is_empty() {
            v.push(format!("{rpath}.errorEquals"), "must not be empty");
        }
        validate_result_path(v, &format!("{rpath}.resultPath"), &rule.result_path);
        if !stage_names.contains(rule.next.as_str()) && !fail_names.contains(rule.next.as_str()) {
            v.push(
                format!("{rpath}.next"),
                format!("must name a defined state, got: {}", rule.next),
            );
        }

        // First-match-wins: a wildcard anywhere but last shadows later rules.
        let is_last = idx + 1 == rules.len();
        if !is_last && rule.error_equals.iter().any(|c| c == WILDCARD) {
            v.warn(
                format!("{rpath}.errorEquals"),
                "wildcard catch rule before the last position shadows later rules",
            );
        }
    }
}
