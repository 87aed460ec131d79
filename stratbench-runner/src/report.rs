//! Report emission: plain-text summary, CSV score table and JSON dump.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aggregate::{GroupSummary, RunSummary, UnitOutcome, UnitResult};
use crate::config::OutputConfig;
use crate::quality::{Dimension, QualityReport};
use crate::score::ScoreRecord;

/// CSV header, in column order.
pub const CSV_HEADER: [&str; 11] = [
    "group",
    "file",
    "unit_name",
    "overall",
    "robustness",
    "quality_overall",
    "structure",
    "error_handling",
    "documentation",
    "complexity",
    "best_practices",
];

/// Fault samples shown per phase in the text report.
const FAULTS_SHOWN: usize = 3;

const RULE: &str = "================================================================================";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not valid UTF-8")]
    Utf8,
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── Recommendations ─────────────────────────────────────────────────

/// Improvement hints for low-scoring areas.
pub fn recommendations(robustness: Option<f64>, quality: &QualityReport) -> Vec<&'static str> {
    let mut out = Vec::new();
    if robustness.map_or(false, |r| r < 80.0) {
        out.push("Improve robustness: check every environment value for () and non-finite numbers before use");
    }
    if quality.error_handling < 60.0 {
        out.push("Add try/catch blocks and comparisons against () for better error handling");
    }
    if quality.documentation < 50.0 {
        out.push("Add //! unit docs and /// docs on functions");
    }
    if quality.complexity < 60.0 {
        out.push("Reduce complexity by splitting large hooks into helper functions");
    }
    if quality.best_practices < 60.0 {
        out.push("Replace magic numbers with named constants or tunables");
    }
    if quality.structure < 70.0 {
        out.push("Improve structure: register the unit and define every required hook");
    }
    out
}

// ─── Text report ─────────────────────────────────────────────────────

/// Quality block with per-rule findings. Used by `score` and the unit blocks.
pub fn render_quality(quality: &QualityReport) -> String {
    let mut s = String::with_capacity(1024);
    s.push_str(&format!("  Overall Quality: {:.2}/100\n", quality.overall));
    if let Some(err) = &quality.parse_error {
        s.push_str(&format!("  Parse failure: {err}\n"));
    }
    for dimension in Dimension::ALL {
        s.push_str(&format!(
            "  {:<16} {:>6.2}/100\n",
            format!("{}:", dimension_label(dimension)),
            quality.score(dimension)
        ));
        for finding in quality.findings.iter().filter(|f| f.dimension == dimension) {
            s.push_str(&format!("      {:+6.2}  {}\n", finding.delta, finding.rationale));
        }
    }
    s
}

fn dimension_label(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Structure => "Structure",
        Dimension::ErrorHandling => "Error Handling",
        Dimension::Documentation => "Documentation",
        Dimension::Complexity => "Complexity",
        Dimension::BestPractices => "Best Practices",
    }
}

/// Detailed block for one unit.
pub fn render_unit(unit: &UnitResult) -> String {
    let mut s = String::with_capacity(2048);
    s.push_str(&format!("{} [{}]\n", unit.path.display(), unit.group));
    if let Some(digest) = &unit.digest {
        s.push_str(&format!("  Digest: {digest}\n"));
    }

    let (robustness, score) = match &unit.outcome {
        UnitOutcome::LoadFailed { error } => {
            s.push_str(&format!("  [ERROR] Load failed: {error}\n"));
            return s;
        }
        UnitOutcome::Scored { robustness, score } => (robustness, score),
    };

    if robustness.initialize_passed {
        s.push_str("  [PASS] initialize()\n");
    } else {
        s.push_str(&format!(
            "  [FAIL] initialize(): {}\n",
            robustness.initialize_error.as_deref().unwrap_or("unknown fault")
        ));
    }
    for (label, phase) in [("Boundary", &robustness.boundary), ("Random", &robustness.random)] {
        s.push_str(&format!(
            "  {label} tests: {}/{} passed, {} failed\n",
            phase.pass_count, phase.test_count, phase.fail_count
        ));
        for fault in phase.faults.iter().take(FAULTS_SHOWN) {
            s.push_str(&format!("    - {}\n", truncate(fault, 100)));
        }
    }

    s.push_str(&format!(
        "\n  Overall Score: {:.2}/100 (Grade: {})\n",
        score.overall, score.grade
    ));
    s.push_str(&format!("  Robustness: {:.2}/100\n", score.robustness));
    s.push_str(&render_quality(&score.quality));

    s.push_str("  Recommendations:\n");
    let recs = recommendations(Some(score.robustness), &score.quality);
    if recs.is_empty() {
        s.push_str("    No major issues found.\n");
    }
    for rec in recs {
        s.push_str(&format!("    - {rec}\n"));
    }
    s.push_str(if unit.passed() {
        "  [PASS] Overall\n"
    } else {
        "  [FAIL] Overall\n"
    });
    s
}

fn render_group(group: &GroupSummary, members: &[(&UnitResult, &ScoreRecord)]) -> String {
    let mut s = String::with_capacity(1024);
    s.push_str(&format!("\n{} ({} units)\n", group.tag.to_uppercase(), group.units));
    s.push_str(&format!("  Passed: {}  Failed: {}\n", group.passed, group.failed));

    if group.scored == 0 {
        s.push_str("  No scored units.\n");
        return s;
    }
    s.push_str("  Individual scores:\n");
    for (unit, score) in members {
        s.push_str(&format!(
            "    {:<28} overall {:>6.2}  robustness {:>6.2}  quality {:>6.2}  {}\n",
            unit.file, score.overall, score.robustness, score.quality.overall, score.grade
        ));
    }
    s.push_str("  Averages:\n");
    s.push_str(&format!("    Overall:    {:.2}/100\n", group.mean_overall));
    s.push_str(&format!("    Robustness: {:.2}/100\n", group.mean_robustness));
    s.push_str(&format!("    Quality:    {:.2}/100\n", group.mean_quality));
    for dimension in Dimension::ALL {
        s.push_str(&format!(
            "      - {}: {:.2}/100\n",
            dimension_label(dimension),
            group.dimension_means.get(dimension)
        ));
    }
    s.push_str(&format!(
        "  Totals (sum of {} units, max {:.2}):\n",
        group.scored, group.max_total
    ));
    s.push_str(&format!("    Overall:    {:.2}/{:.2}\n", group.total_overall, group.max_total));
    s.push_str(&format!("    Robustness: {:.2}/{:.2}\n", group.total_robustness, group.max_total));
    s.push_str(&format!("    Quality:    {:.2}/{:.2}\n", group.total_quality, group.max_total));
    s
}

/// Full plain-text report for a run.
pub fn render_text(summary: &RunSummary) -> String {
    let mut s = String::with_capacity(8192);
    s.push_str(RULE);
    s.push_str("\nSTRATEGY ROBUSTNESS & QUALITY REPORT\n");
    s.push_str(RULE);
    s.push('\n');
    s.push_str(&format!("Started:     {}\n", summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")));
    s.push_str(&format!("Fingerprint: {}\n", summary.fingerprint));
    s.push_str(&format!(
        "Seed:        {} ({} random cases)\n\n",
        summary.seed, summary.random_count
    ));

    for unit in &summary.units {
        s.push_str(&render_unit(unit));
        s.push('\n');
    }

    let all = &summary.overall;
    s.push_str(RULE);
    s.push_str("\nSUMMARY\n");
    s.push_str(RULE);
    s.push('\n');
    s.push_str(&format!("  Total units: {}\n", all.units));
    s.push_str(&format!("  Passed: {}\n", all.passed));
    s.push_str(&format!("  Failed: {}\n", all.failed));
    if all.scored > 0 {
        s.push_str("\n  Overall averages:\n");
        s.push_str(&format!("    Overall:    {:.2}/100\n", all.mean_overall));
        s.push_str(&format!("    Robustness: {:.2}/100\n", all.mean_robustness));
        s.push_str(&format!("    Quality:    {:.2}/100\n", all.mean_quality));
    }

    s.push('\n');
    s.push_str(RULE);
    s.push_str("\nGROUP SUMMARY\n");
    s.push_str(RULE);
    s.push('\n');
    for group in &summary.groups {
        let members: Vec<_> = summary
            .scored_units()
            .filter(|(u, _)| u.group == group.tag)
            .collect();
        s.push_str(&render_group(group, &members));
    }
    s
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

// ─── CSV / JSON ──────────────────────────────────────────────────────

/// One row per scored unit, numbers with two decimals.
pub fn render_csv(summary: &RunSummary) -> Result<String, ReportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for (unit, score) in summary.scored_units() {
        let q = &score.quality;
        let mut record = vec![unit.group.clone(), unit.file.clone(), unit.unit_name.clone()];
        record.extend(
            [
                score.overall,
                score.robustness,
                q.overall,
                q.structure,
                q.error_handling,
                q.documentation,
                q.complexity,
                q.best_practices,
            ]
            .iter()
            .map(|v| format!("{v:.2}")),
        );
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().map_err(|e| ReportError::Csv(e.into_error().into()))?;
    String::from_utf8(data).map_err(|_| ReportError::Utf8)
}

pub fn render_json(summary: &RunSummary) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(summary)?)
}

// ─── Writing ─────────────────────────────────────────────────────────

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    let wrap = |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, contents).map_err(wrap)
}

/// Write every configured artifact. Returns the paths written.
pub fn emit(summary: &RunSummary, output: &OutputConfig) -> Result<Vec<PathBuf>, ReportError> {
    let mut written = Vec::new();

    write_file(&output.report_path, &render_text(summary))?;
    written.push(output.report_path.clone());

    write_file(&output.csv_path, &render_csv(summary)?)?;
    written.push(output.csv_path.clone());

    if let Some(json_path) = &output.json_path {
        write_file(json_path, &render_json(summary)?)?;
        written.push(json_path.clone());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{default_groups, group_tag};
    use crate::quality::{score_source, ParseFailure, QualityWeights};
    use crate::score::{combine, ScoringPolicy};
    use chrono::{TimeZone, Utc};
    use stratbench_core::{LoadError, PhaseReport, RobustnessReport};

    fn scored_unit(path: &str, source: &str) -> UnitResult {
        let mut boundary = PhaseReport::default();
        boundary.record_case(vec![]);
        boundary.record_case(vec!["Test case 'x' (position=0) execution failed: boom".into()]);
        let mut random = PhaseReport::default();
        random.record_case(vec![]);
        let quality = score_source(source, &QualityWeights::default());
        UnitResult {
            group: group_tag(Path::new(path), &default_groups()),
            path: path.into(),
            file: Path::new(path).file_name().unwrap().to_string_lossy().into(),
            unit_name: "unit".into(),
            digest: Some("abc".into()),
            outcome: UnitOutcome::Scored {
                robustness: RobustnessReport {
                    initialize_passed: true,
                    initialize_error: None,
                    symbol: "TEST_SYMBOL".into(),
                    boundary,
                    random,
                },
                score: combine(70.0, &quality, &ScoringPolicy::default()),
            },
        }
    }

    fn summary() -> RunSummary {
        RunSummary::new(
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            "f00d".into(),
            42,
            1,
            vec![
                scored_unit("strategies/gpt/a.rhai", "fn initialize() {} fn handle_data() {}"),
                UnitResult {
                    group: "gemini".into(),
                    path: "strategies/gemini/b.rhai".into(),
                    file: "b.rhai".into(),
                    unit_name: String::new(),
                    digest: None,
                    outcome: UnitOutcome::LoadFailed {
                        error: LoadError::NoStrategy,
                    },
                },
            ],
        )
    }

    #[test]
    fn csv_has_header_and_scored_rows_only() {
        let csv = render_csv(&summary()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        let row: Vec<_> = lines.next().unwrap().split(',').collect();
        assert_eq!(row[0], "gpt");
        assert_eq!(row[1], "a.rhai");
        assert_eq!(row[4], "70.00");
        assert!(row[3..].iter().all(|v| v.split('.').nth(1).map_or(false, |d| d.len() == 2)));
        assert!(lines.next().is_none());
    }

    #[test]
    fn text_report_covers_units_and_groups() {
        let text = render_text(&summary());
        assert!(text.contains("Fingerprint: f00d"));
        assert!(text.contains("Boundary tests: 1/2 passed, 1 failed"));
        assert!(text.contains("[ERROR] Load failed: no strategy found"));
        assert!(text.contains("GPT (1 units)"));
        assert!(text.contains("GEMINI (1 units)"));
        assert!(text.contains("Totals (sum of 1 units, max 100.00)"));
        assert!(text.contains("Recommendations:"));
    }

    #[test]
    fn recommendations_follow_thresholds() {
        let perfect = QualityReport {
            structure: 100.0,
            error_handling: 100.0,
            documentation: 100.0,
            complexity: 100.0,
            best_practices: 100.0,
            overall: 100.0,
            findings: vec![],
            parse_error: None,
        };
        assert!(recommendations(Some(100.0), &perfect).is_empty());
        assert_eq!(recommendations(Some(79.99), &perfect).len(), 1);
        let zero = QualityReport::failed(&ParseFailure::Syntax("x".into()));
        assert_eq!(recommendations(Some(0.0), &zero).len(), 6);
    }

    #[test]
    fn json_round_trips() {
        let s = summary();
        let json = render_json(&s).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.fingerprint, s.fingerprint);
        assert_eq!(back.units.len(), 2);
        assert_eq!(back.units[1].outcome, s.units[1].outcome);
        assert_eq!(back.overall.scored, 1);
    }

    #[test]
    fn emit_creates_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = OutputConfig {
            report_path: dir.path().join("out/report.txt"),
            csv_path: dir.path().join("out/scores.csv"),
            json_path: Some(dir.path().join("out/run.json")),
        };
        let written = emit(&summary(), &output).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn long_faults_are_truncated() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
