use serde::Serialize;
use std::path::PathBuf;

/// Mismatch count reported when no validator summary line was found.
pub const MISSING_MISMATCHES: u64 = 999;

/// Totals from the generators' exit summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratorCounts {
    pub modules: usize,
    pub generated: u64,
    pub sent: u64,
}

/// Totals from the reversers' exit summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReverserCounts {
    pub modules: usize,
    pub received: u64,
    pub sent: u64,
}

/// Validator exit summary. `mismatches` stays `None` until a line is seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidatorCounts {
    pub modules: usize,
    pub received_reversed: u64,
    pub compared: u64,
    pub mismatches: Option<u64>,
}

impl ValidatorCounts {
    pub fn mismatches_or_sentinel(&self) -> u64 {
        self.mismatches.unwrap_or(MISSING_MISMATCHES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// A warning or error line found in a log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogProblem {
    pub path: PathBuf,
    pub line: usize,
    pub severity: Severity,
    pub text: String,
}

/// Everything scraped from one test session's log files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: usize,
    pub generator: GeneratorCounts,
    pub reverser: ReverserCounts,
    pub validator: ValidatorCounts,
    pub problems: Vec<LogProblem>,
}
