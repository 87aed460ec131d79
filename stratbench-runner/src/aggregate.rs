//! Per-unit results rolled up into per-group and run-wide summaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stratbench_core::{round2, LoadError, RobustnessReport};

use crate::quality::Dimension;
use crate::score::ScoreRecord;

/// Tag for units matching no group.
pub const UNKNOWN_GROUP: &str = "unknown";

/// Tag for the run-wide summary.
pub const ALL_GROUP: &str = "all";

/// Maps path substrings to a group tag. First match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRule {
    pub tag: String,
    pub patterns: Vec<String>,
}

impl GroupRule {
    pub fn new(tag: &str, patterns: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

pub fn default_groups() -> Vec<GroupRule> {
    vec![
        GroupRule::new("gemini", &["gemini"]),
        GroupRule::new("gpt", &["gpt", "chatgpt"]),
        GroupRule::new("deepseek", &["deepseek"]),
    ]
}

/// Group tag for a unit path: lowercased path matched against each rule's
/// patterns in order.
pub fn group_tag(path: &Path, groups: &[GroupRule]) -> String {
    let haystack = path.to_string_lossy().to_lowercase();
    groups
        .iter()
        .find(|rule| {
            rule.patterns
                .iter()
                .any(|p| haystack.contains(&p.to_lowercase()))
        })
        .map(|rule| rule.tag.clone())
        .unwrap_or_else(|| UNKNOWN_GROUP.to_string())
}

// ─── Unit results ────────────────────────────────────────────────────

/// What happened to one discovered unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Scored {
        robustness: RobustnessReport,
        score: ScoreRecord,
    },
    LoadFailed {
        error: LoadError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub group: String,
    pub path: PathBuf,
    /// File name without directories.
    pub file: String,
    pub unit_name: String,
    /// BLAKE3 of the source, when it could be read.
    pub digest: Option<String>,
    pub outcome: UnitOutcome,
}

impl UnitResult {
    pub fn score(&self) -> Option<&ScoreRecord> {
        match &self.outcome {
            UnitOutcome::Scored { score, .. } => Some(score),
            UnitOutcome::LoadFailed { .. } => None,
        }
    }

    pub fn robustness(&self) -> Option<&RobustnessReport> {
        match &self.outcome {
            UnitOutcome::Scored { robustness, .. } => Some(robustness),
            UnitOutcome::LoadFailed { .. } => None,
        }
    }

    /// Loaded, initialize succeeded, and neither phase faulted.
    pub fn passed(&self) -> bool {
        self.robustness().map_or(false, RobustnessReport::passed)
    }
}

// ─── Summaries ───────────────────────────────────────────────────────

/// Mean of each quality sub-score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionMeans {
    pub structure: f64,
    pub error_handling: f64,
    pub documentation: f64,
    pub complexity: f64,
    pub best_practices: f64,
}

impl DimensionMeans {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Structure => self.structure,
            Dimension::ErrorHandling => self.error_handling,
            Dimension::Documentation => self.documentation,
            Dimension::Complexity => self.complexity,
            Dimension::BestPractices => self.best_practices,
        }
    }
}

/// Aggregates over a set of units. Means and totals cover scored units only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub tag: String,
    pub units: usize,
    pub scored: usize,
    pub passed: usize,
    pub failed: usize,
    pub mean_robustness: f64,
    pub mean_quality: f64,
    pub mean_overall: f64,
    pub dimension_means: DimensionMeans,
    pub total_robustness: f64,
    pub total_quality: f64,
    pub total_overall: f64,
    /// Maximum attainable total: 100 per scored unit.
    pub max_total: f64,
}

impl GroupSummary {
    pub fn from_units<'a>(tag: &str, units: impl IntoIterator<Item = &'a UnitResult>) -> Self {
        let mut summary = GroupSummary {
            tag: tag.to_string(),
            ..GroupSummary::default()
        };
        let mut dims = DimensionMeans::default();

        for unit in units {
            summary.units += 1;
            if unit.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            let Some(score) = unit.score() else {
                continue;
            };
            summary.scored += 1;
            summary.total_robustness += score.robustness;
            summary.total_quality += score.quality.overall;
            summary.total_overall += score.overall;
            dims.structure += score.quality.structure;
            dims.error_handling += score.quality.error_handling;
            dims.documentation += score.quality.documentation;
            dims.complexity += score.quality.complexity;
            dims.best_practices += score.quality.best_practices;
        }

        if summary.scored > 0 {
            let n = summary.scored as f64;
            summary.mean_robustness = round2(summary.total_robustness / n);
            summary.mean_quality = round2(summary.total_quality / n);
            summary.mean_overall = round2(summary.total_overall / n);
            summary.dimension_means = DimensionMeans {
                structure: round2(dims.structure / n),
                error_handling: round2(dims.error_handling / n),
                documentation: round2(dims.documentation / n),
                complexity: round2(dims.complexity / n),
                best_practices: round2(dims.best_practices / n),
            };
        }
        summary.total_robustness = round2(summary.total_robustness);
        summary.total_quality = round2(summary.total_quality);
        summary.total_overall = round2(summary.total_overall);
        summary.max_total = 100.0 * summary.scored as f64;
        summary
    }
}

/// Everything one harness run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    /// BLAKE3 over the effective config and every unit digest.
    pub fingerprint: String,
    pub seed: u64,
    pub random_count: usize,
    pub units: Vec<UnitResult>,
    /// Per-group summaries, sorted by tag.
    pub groups: Vec<GroupSummary>,
    pub overall: GroupSummary,
}

impl RunSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        fingerprint: String,
        seed: u64,
        random_count: usize,
        units: Vec<UnitResult>,
    ) -> Self {
        let mut by_group: BTreeMap<&str, Vec<&UnitResult>> = BTreeMap::new();
        for unit in &units {
            by_group.entry(unit.group.as_str()).or_default().push(unit);
        }
        let groups = by_group
            .into_iter()
            .map(|(tag, members)| GroupSummary::from_units(tag, members))
            .collect();
        let overall = GroupSummary::from_units(ALL_GROUP, &units);

        Self {
            started_at,
            fingerprint,
            seed,
            random_count,
            units,
            groups,
            overall,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.units.iter().all(UnitResult::passed)
    }

    /// 0 when every unit passed (including an empty run), else 1.
    pub fn exit_status(&self) -> i32 {
        if self.all_passed() {
            0
        } else {
            1
        }
    }

    pub fn scored_units(&self) -> impl Iterator<Item = (&UnitResult, &ScoreRecord)> {
        self.units.iter().filter_map(|u| u.score().map(|s| (u, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{score_source, QualityWeights};
    use crate::score::{combine, ScoringPolicy};
    use stratbench_core::PhaseReport;

    fn phase(pass: usize, fail: usize) -> PhaseReport {
        let mut p = PhaseReport::default();
        (0..pass).for_each(|_| p.record_case(vec![]));
        (0..fail).for_each(|_| p.record_case(vec!["x".into()]));
        p
    }

    fn scored(path: &str, robustness: f64, clean: bool) -> UnitResult {
        let quality = score_source("", &QualityWeights::default());
        UnitResult {
            group: group_tag(Path::new(path), &default_groups()),
            path: path.into(),
            file: path.rsplit('/').next().unwrap_or(path).to_string(),
            unit_name: "u".into(),
            digest: Some("d".into()),
            outcome: UnitOutcome::Scored {
                robustness: RobustnessReport {
                    initialize_passed: true,
                    initialize_error: None,
                    symbol: "TEST_SYMBOL".into(),
                    boundary: phase(10, if clean { 0 } else { 1 }),
                    random: phase(5, 0),
                },
                score: combine(robustness, &quality, &ScoringPolicy::default()),
            },
        }
    }

    fn failed(path: &str) -> UnitResult {
        UnitResult {
            group: group_tag(Path::new(path), &default_groups()),
            path: path.into(),
            file: path.into(),
            unit_name: String::new(),
            digest: None,
            outcome: UnitOutcome::LoadFailed {
                error: LoadError::NoStrategy,
            },
        }
    }

    #[test]
    fn group_tags() {
        let groups = default_groups();
        assert_eq!(group_tag(Path::new("strategies/GPT/a.rhai"), &groups), "gpt");
        assert_eq!(group_tag(Path::new("s/chatgpt_v2.rhai"), &groups), "gpt");
        assert_eq!(group_tag(Path::new("s/Gemini-pro/a.rhai"), &groups), "gemini");
        assert_eq!(group_tag(Path::new("s/deepseek/a.rhai"), &groups), "deepseek");
        assert_eq!(group_tag(Path::new("s/claude/a.rhai"), &groups), UNKNOWN_GROUP);
    }

    #[test]
    fn first_matching_rule_wins() {
        let groups = vec![GroupRule::new("first", &["x"]), GroupRule::new("second", &["x"])];
        assert_eq!(group_tag(Path::new("x.rhai"), &groups), "first");
    }

    #[test]
    fn group_means_and_totals() {
        let units = [scored("gpt/a.rhai", 100.0, true), scored("gpt/b.rhai", 50.0, false)];
        let g = GroupSummary::from_units("gpt", &units);
        assert_eq!(g.units, 2);
        assert_eq!(g.passed, 1);
        assert_eq!(g.failed, 1);
        assert_eq!(g.mean_robustness, 75.0);
        assert_eq!(g.total_robustness, 150.0);
        assert_eq!(g.max_total, 200.0);
        assert_eq!(g.dimension_means.structure, 50.0);
    }

    #[test]
    fn load_failures_count_as_failed_but_not_scored() {
        let summary = RunSummary::new(
            Utc::now(),
            "fp".into(),
            42,
            50,
            vec![scored("gpt/a.rhai", 100.0, true), failed("deepseek/bad.rhai")],
        );
        assert_eq!(summary.overall.units, 2);
        assert_eq!(summary.overall.scored, 1);
        assert_eq!(summary.overall.failed, 1);
        assert_eq!(summary.exit_status(), 1);
        let tags: Vec<_> = summary.groups.iter().map(|g| g.tag.as_str()).collect();
        assert_eq!(tags, ["deepseek", "gpt"]);
        assert_eq!(summary.scored_units().count(), 1);
    }

    #[test]
    fn empty_run_exits_zero() {
        let summary = RunSummary::new(Utc::now(), "fp".into(), 42, 50, vec![]);
        assert_eq!(summary.exit_status(), 0);
        assert_eq!(summary.overall.mean_overall, 0.0);
    }
}
