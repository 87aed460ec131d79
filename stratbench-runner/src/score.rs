//! Combined scoring: robustness and quality merged into one overall score
//! and a letter grade.

use std::fmt;

use serde::{Deserialize, Serialize};
use stratbench_core::{robustness_score, round2, PhaseWeights, RobustnessReport};

use crate::quality::{QualityReport, QualityWeights};

/// Every weight the harness applies. Loaded from the `[policy]` section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub robustness_weight: f64,
    pub quality_weight: f64,
    pub boundary_weight: f64,
    pub random_weight: f64,
    pub quality: QualityWeights,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            robustness_weight: 0.4,
            quality_weight: 0.6,
            boundary_weight: 0.6,
            random_weight: 0.4,
            quality: QualityWeights::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn phase_weights(&self) -> PhaseWeights {
        PhaseWeights {
            boundary: self.boundary_weight,
            random: self.random_weight,
        }
    }

    /// Named weights, for validation and the run fingerprint.
    pub fn named_weights(&self) -> [(&'static str, f64); 9] {
        [
            ("robustness_weight", self.robustness_weight),
            ("quality_weight", self.quality_weight),
            ("boundary_weight", self.boundary_weight),
            ("random_weight", self.random_weight),
            ("quality.structure", self.quality.structure),
            ("quality.error_handling", self.quality.error_handling),
            ("quality.documentation", self.quality.documentation),
            ("quality.complexity", self.quality.complexity),
            ("quality.best_practices", self.quality.best_practices),
        ]
    }
}

/// Letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Strict `>=` thresholds, checked top-down.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final score for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub robustness: f64,
    pub quality: QualityReport,
    pub overall: f64,
    pub grade: Grade,
}

/// `robustness × w_r + quality × w_q`, clamped and rounded to two decimals.
pub fn combine(robustness: f64, quality: &QualityReport, policy: &ScoringPolicy) -> ScoreRecord {
    let raw = robustness * policy.robustness_weight + quality.overall * policy.quality_weight;
    let overall = round2(raw.clamp(0.0, 100.0));
    ScoreRecord {
        robustness,
        quality: quality.clone(),
        overall,
        grade: Grade::from_score(overall),
    }
}

/// Score a unit from its robustness report and quality report.
pub fn score_unit(report: &RobustnessReport, quality: &QualityReport, policy: &ScoringPolicy) -> ScoreRecord {
    combine(robustness_score(report, &policy.phase_weights()), quality, policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{score_source, ParseFailure};

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::from_score(90.0), Grade::A);
        assert_eq!(Grade::from_score(89.99), Grade::B);
        assert_eq!(Grade::from_score(80.0), Grade::B);
        assert_eq!(Grade::from_score(70.0), Grade::C);
        assert_eq!(Grade::from_score(60.0), Grade::D);
        assert_eq!(Grade::from_score(59.99), Grade::F);
        assert_eq!(Grade::from_score(0.0), Grade::F);
    }

    #[test]
    fn combine_weights_and_rounds() {
        let quality = score_source("", &QualityWeights::default());
        // 100 * 0.4 + 45 * 0.6 = 67
        let record = combine(100.0, &quality, &ScoringPolicy::default());
        assert_eq!(record.overall, 67.0);
        assert_eq!(record.grade, Grade::D);
    }

    #[test]
    fn zero_everything_is_f() {
        let quality = QualityReport::failed(&ParseFailure::Syntax("x".into()));
        let record = combine(0.0, &quality, &ScoringPolicy::default());
        assert_eq!(record.overall, 0.0);
        assert_eq!(record.grade, Grade::F);
    }

    #[test]
    fn default_policy_round_trips_toml() {
        let policy = ScoringPolicy::default();
        let text = toml::to_string(&policy).unwrap();
        let back: ScoringPolicy = toml::from_str(&text).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn partial_policy_fills_defaults() {
        let policy: ScoringPolicy = toml::from_str("robustness_weight = 0.5\nquality_weight = 0.5").unwrap();
        assert_eq!(policy.robustness_weight, 0.5);
        assert_eq!(policy.boundary_weight, 0.6);
        assert_eq!(policy.quality, QualityWeights::default());
    }
}
