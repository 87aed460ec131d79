//! Static quality scoring of unit source text.
//!
//! The source is lexed and outlined (see [`outline`]); the ordered rule list
//! in [`rules`] then produces per-dimension deltas. A dimension's score is its
//! base plus the sum of its rules' deltas, clamped to [0, 100]. The overall
//! quality score is the weighted sum of the five dimensions.
//!
//! Source that fails to parse scores zero everywhere.

pub mod lexer;
pub mod outline;
pub mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};
use stratbench_core::round2;
use tracing::debug;

pub use outline::{ParseFailure, SourceOutline};
pub use rules::{default_rules, QualityRule};

/// One of the five scored aspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Structure,
    ErrorHandling,
    Documentation,
    Complexity,
    BestPractices,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Structure,
        Dimension::ErrorHandling,
        Dimension::Documentation,
        Dimension::Complexity,
        Dimension::BestPractices,
    ];

    /// Score before any rule applies.
    pub fn base(self) -> f64 {
        match self {
            Dimension::Structure => 50.0,
            Dimension::ErrorHandling => 30.0,
            Dimension::Documentation => 0.0,
            Dimension::Complexity => 0.0,
            Dimension::BestPractices => 50.0,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Dimension::Structure => "structure",
            Dimension::ErrorHandling => "error_handling",
            Dimension::Documentation => "documentation",
            Dimension::Complexity => "complexity",
            Dimension::BestPractices => "best_practices",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Weights of the five dimensions in the quality overall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub structure: f64,
    pub error_handling: f64,
    pub documentation: f64,
    pub complexity: f64,
    pub best_practices: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            structure: 0.20,
            error_handling: 0.25,
            documentation: 0.15,
            complexity: 0.15,
            best_practices: 0.25,
        }
    }
}

impl QualityWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Structure => self.structure,
            Dimension::ErrorHandling => self.error_handling,
            Dimension::Documentation => self.documentation,
            Dimension::Complexity => self.complexity,
            Dimension::BestPractices => self.best_practices,
        }
    }
}

/// What one rule contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: String,
    pub dimension: Dimension,
    pub delta: f64,
    pub rationale: String,
}

/// Five sub-scores, their weighted overall, and the findings behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub structure: f64,
    pub error_handling: f64,
    pub documentation: f64,
    pub complexity: f64,
    pub best_practices: f64,
    pub overall: f64,
    pub findings: Vec<Finding>,
    /// Set when the source failed to parse.
    pub parse_error: Option<String>,
}

impl QualityReport {
    /// All-zero report for unparseable source.
    pub fn failed(reason: &ParseFailure) -> Self {
        Self {
            structure: 0.0,
            error_handling: 0.0,
            documentation: 0.0,
            complexity: 0.0,
            best_practices: 0.0,
            overall: 0.0,
            findings: Vec::new(),
            parse_error: Some(reason.to_string()),
        }
    }

    pub fn score(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Structure => self.structure,
            Dimension::ErrorHandling => self.error_handling,
            Dimension::Documentation => self.documentation,
            Dimension::Complexity => self.complexity,
            Dimension::BestPractices => self.best_practices,
        }
    }

    fn set(&mut self, dimension: Dimension, value: f64) {
        match dimension {
            Dimension::Structure => self.structure = value,
            Dimension::ErrorHandling => self.error_handling = value,
            Dimension::Documentation => self.documentation = value,
            Dimension::Complexity => self.complexity = value,
            Dimension::BestPractices => self.best_practices = value,
        }
    }
}

/// Scores source text with a fixed rule list.
pub struct QualityScorer {
    rules: Vec<Box<dyn QualityRule>>,
    weights: QualityWeights,
}

impl QualityScorer {
    pub fn new(weights: QualityWeights) -> Self {
        Self::with_rules(default_rules(), weights)
    }

    pub fn with_rules(rules: Vec<Box<dyn QualityRule>>, weights: QualityWeights) -> Self {
        Self { rules, weights }
    }

    pub fn score(&self, source: &str) -> QualityReport {
        let outline = match SourceOutline::parse(source) {
            Ok(outline) => outline,
            Err(failure) => {
                debug!(%failure, "source failed to parse; quality is zero");
                return QualityReport::failed(&failure);
            }
        };

        let findings: Vec<Finding> = self
            .rules
            .iter()
            .map(|rule| {
                let (delta, rationale) = rule.evaluate(&outline);
                Finding {
                    rule: rule.id().to_string(),
                    dimension: rule.dimension(),
                    delta,
                    rationale,
                }
            })
            .collect();

        let mut report = QualityReport {
            structure: 0.0,
            error_handling: 0.0,
            documentation: 0.0,
            complexity: 0.0,
            best_practices: 0.0,
            overall: 0.0,
            findings: Vec::new(),
            parse_error: None,
        };
        let mut overall = 0.0;
        for dimension in Dimension::ALL {
            let sum: f64 = findings
                .iter()
                .filter(|f| f.dimension == dimension)
                .map(|f| f.delta)
                .sum();
            let value = (dimension.base() + sum).clamp(0.0, 100.0);
            report.set(dimension, value);
            overall += value * self.weights.weight(dimension);
        }
        report.overall = round2(overall);
        report.findings = findings;
        report
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(QualityWeights::default())
    }
}

/// Score `source` with the default rule list.
pub fn score_source(source: &str, weights: &QualityWeights) -> QualityReport {
    QualityScorer::new(*weights).score(source)
}
