use crate::log::summary::RunSummary;
use std::fmt;

/// Thresholds a session's summary must meet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectations {
    /// Minimum lists each stage must have handled.
    pub min_events: u64,
    /// Copies a generator sends per list (one per consumer).
    pub copies_per_list: u64,
    /// Accept warning/error lines in the logs.
    pub allow_problems: bool,
}

impl Expectations {
    /// One list per second of run time, two copies each.
    pub fn for_run_duration(seconds: u64) -> Self {
        Self {
            min_events: seconds,
            copies_per_list: 2,
            allow_problems: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub check: &'static str,
    pub expected: String,
    pub actual: u64,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.check, self.expected, self.actual)
    }
}

/// Compare `summary` against `exp`; an empty result means the session passed.
pub fn check_summary(summary: &RunSummary, exp: &Expectations) -> Vec<Failure> {
    let min = exp.min_events;
    let mut failures = Vec::new();
    let mut at_least = |check: &'static str, actual: u64, bound: u64| {
        if actual < bound {
            failures.push(Failure {
                check,
                expected: format!(">= {}", bound),
                actual,
            });
        }
    };

    at_least("generator generated", summary.generator.generated, min);
    at_least(
        "generator sent",
        summary.generator.sent,
        min.saturating_mul(exp.copies_per_list),
    );
    at_least("reverser received", summary.reverser.received, min);
    at_least("reverser sent", summary.reverser.sent, min);
    at_least("validator compared", summary.validator.compared, min);
    at_least(
        "validator received",
        summary.validator.received_reversed,
        min,
    );

    let mismatches = summary.validator.mismatches_or_sentinel();
    if mismatches != 0 {
        failures.push(Failure {
            check: "validator mismatches",
            expected: "0".to_string(),
            actual: mismatches,
        });
    }

    if !exp.allow_problems && !summary.problems.is_empty() {
        failures.push(Failure {
            check: "error-free logs",
            expected: "no warning or error lines".to_string(),
            actual: summary.problems.len() as u64,
        });
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::summary::{
        GeneratorCounts, LogProblem, ReverserCounts, Severity, ValidatorCounts,
    };
    use pretty_assertions::assert_eq;

    fn healthy(n: u64) -> RunSummary {
        RunSummary {
            files: 1,
            generator: GeneratorCounts {
                modules: 1,
                generated: n,
                sent: 2 * n,
            },
            reverser: ReverserCounts {
                modules: 1,
                received: n,
                sent: n,
            },
            validator: ValidatorCounts {
                modules: 1,
                received_reversed: n,
                compared: n,
                mismatches: Some(0),
            },
            problems: vec![],
        }
    }

    #[test]
    fn healthy_session_passes() {
        let failures = check_summary(&healthy(20), &Expectations::for_run_duration(20));
        assert!(failures.is_empty(), "{failures:?}");
    }

    #[test]
    fn empty_session_fails_every_check() {
        let failures = check_summary(&RunSummary::default(), &Expectations::for_run_duration(20));
        let checks: Vec<_> = failures.iter().map(|f| f.check).collect();
        assert_eq!(
            checks,
            [
                "generator generated",
                "generator sent",
                "reverser received",
                "reverser sent",
                "validator compared",
                "validator received",
                "validator mismatches",
            ]
        );
        assert_eq!(failures[6].actual, 999);
    }

    #[test]
    fn short_send_count_is_reported() {
        let mut s = healthy(20);
        s.generator.sent = 39;
        let failures = check_summary(&s, &Expectations::for_run_duration(20));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].to_string(), "generator sent: expected >= 40, got 39");
    }

    #[test]
    fn problems_fail_unless_allowed() {
        let mut s = healthy(5);
        s.problems.push(LogProblem {
            path: "log.txt".into(),
            line: 3,
            severity: Severity::Error,
            text: "ERROR boom".into(),
        });
        let mut exp = Expectations::for_run_duration(5);
        assert_eq!(check_summary(&s, &exp).len(), 1);
        exp.allow_problems = true;
        assert!(check_summary(&s, &exp).is_empty());
    }
}
