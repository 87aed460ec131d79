//! Execution outcomes and robustness reports.

use rhai::EvalAltResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fault messages kept per phase.
pub const MAX_FAULT_SAMPLES: usize = 10;

/// Why a hook call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// The unit raised: a script error, a `throw`, or a type mismatch.
    Raised,
    /// The wall-clock deadline expired.
    Timeout,
    /// The operation budget or another sandbox limit was exhausted.
    Budget,
}

/// A fault raised by one hook call.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ExecutionFault {
    pub hook: String,
    pub kind: FaultKind,
    pub message: String,
}

impl ExecutionFault {
    pub fn new(hook: &str, kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            hook: hook.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Classify an interpreter error.
    pub fn from_eval(hook: &str, err: &EvalAltResult) -> Self {
        match err {
            EvalAltResult::ErrorTerminated(_, _) => {
                Self::new(hook, FaultKind::Timeout, format!("{hook}() timed out"))
            }
            EvalAltResult::ErrorTooManyOperations(_)
            | EvalAltResult::ErrorStackOverflow(_)
            | EvalAltResult::ErrorDataTooLarge(_, _) => {
                Self::new(hook, FaultKind::Budget, format!("{hook}() exceeded sandbox limits: {err}"))
            }
            _ => Self::new(hook, FaultKind::Raised, err.to_string()),
        }
    }
}

/// Result of one hook invocation.
pub type ExecutionOutcome = Result<(), ExecutionFault>;

/// Counts for one phase. Counts cases, not case × position pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub test_count: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Total faulted (case, position) invocations, including setup failures.
    pub fault_count: usize,
    /// First [`MAX_FAULT_SAMPLES`] fault messages.
    pub faults: Vec<String>,
}

impl PhaseReport {
    /// Record one case. It passes only if every message list is empty.
    pub fn record_case(&mut self, fault_messages: Vec<String>) {
        self.test_count += 1;
        if fault_messages.is_empty() {
            self.pass_count += 1;
            return;
        }
        self.fail_count += 1;
        self.fault_count += fault_messages.len();
        for message in fault_messages {
            if self.faults.len() < MAX_FAULT_SAMPLES {
                self.faults.push(message);
            }
        }
    }

    /// Pass rate capped at 1.0. Zero when nothing ran.
    pub fn pass_rate(&self) -> f64 {
        if self.test_count == 0 {
            return 0.0;
        }
        (self.pass_count as f64 / self.test_count as f64).min(1.0)
    }

    pub fn is_clean(&self) -> bool {
        self.fail_count == 0
    }
}

/// Full robustness result for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub initialize_passed: bool,
    pub initialize_error: Option<String>,
    /// Symbol the phases ran against.
    pub symbol: String,
    pub boundary: PhaseReport,
    pub random: PhaseReport,
}

impl RobustnessReport {
    /// Overall pass: initialize succeeded and neither phase faulted.
    pub fn passed(&self) -> bool {
        self.initialize_passed && self.boundary.is_clean() && self.random.is_clean()
    }
}

/// Weights of the two phases in the robustness score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseWeights {
    pub boundary: f64,
    pub random: f64,
}

impl Default for PhaseWeights {
    fn default() -> Self {
        Self {
            boundary: 0.6,
            random: 0.4,
        }
    }
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Robustness score in [0, 100].
///
/// Zero if `initialize` failed; otherwise the weighted pass rates scaled to
/// 100 and rounded to two decimals.
pub fn robustness_score(report: &RobustnessReport, weights: &PhaseWeights) -> f64 {
    if !report.initialize_passed {
        return 0.0;
    }
    let raw = (report.boundary.pass_rate() * weights.boundary
        + report.random.pass_rate() * weights.random)
        * 100.0;
    round2(raw.clamp(0.0, 100.0))
}
