use std::time::Duration;

use conveyor_core::types::RetryRule;

use crate::retry::AttemptCounters;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration },
    Stop { reason: StopReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No declared rule matches the error's classification.
    NoMatchingRule,
    /// The first matching rule has spent its retry budget.
    AttemptsExhausted,
}

/// Decide whether to retry the current stage and how long to wait first.
///
/// Rules are consulted in declared order, first classification match wins.
/// An exhausted match stops the evaluation outright: the error falls through
/// to catch handling exactly as if no rule had matched. Delays are
/// deterministic: `intervalSeconds * backoffRate^attemptIndex`, attempt
/// index starting at 0 for the first retry.
pub fn decide_retry(
    rules: &[RetryRule],
    counters: &mut AttemptCounters,
    classification: &str,
) -> RetryDecision {
    for (idx, rule) in rules.iter().enumerate() {
        if !rule.matches(classification) {
            continue;
        }
        let made = counters.made(idx);
        if made >= rule.max_attempts {
            return RetryDecision::Stop {
                reason: StopReason::AttemptsExhausted,
            };
        }
        let delay = backoff_delay(rule, made);
        counters.record(idx);
        return RetryDecision::RetryAfter { delay };
    }
    RetryDecision::Stop {
        reason: StopReason::NoMatchingRule,
    }
}

fn backoff_delay(rule: &RetryRule, attempt_index: u32) -> Duration {
    let secs = rule.interval_seconds as f64 * rule.backoff_rate.powi(attempt_index as i32);
    Duration::from_secs_f64(secs)
}
