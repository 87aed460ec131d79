//! StratBench Runner: harness orchestration, static quality scoring,
//! combined grading, aggregation and reports.
//!
//! This crate builds on `stratbench-core` to provide:
//! - Static quality scoring over five dimensions
//! - Combined overall score and letter grade
//! - Per-group and run-wide summaries
//! - Text, CSV and JSON reports
//! - TOML harness configuration and run fingerprinting

pub mod aggregate;
pub mod config;
pub mod harness;
pub mod quality;
pub mod report;
pub mod score;

pub use aggregate::{
    default_groups, group_tag, DimensionMeans, GroupRule, GroupSummary, RunSummary, UnitOutcome,
    UnitResult, ALL_GROUP, UNKNOWN_GROUP,
};
pub use config::{ConfigError, DiscoveryConfig, HarnessConfig, OutputConfig, ScenarioConfig};
pub use harness::{
    discover_units, run_fingerprint, run_harness, ConsolePrinter, HarnessError, HarnessProgress,
    SilentProgress,
};
pub use quality::{
    score_source, Dimension, Finding, ParseFailure, QualityReport, QualityRule, QualityScorer,
    QualityWeights, SourceOutline,
};
pub use report::{
    emit, recommendations, render_csv, render_json, render_quality, render_text, render_unit,
    write_file, ReportError, CSV_HEADER,
};
pub use score::{combine, score_unit, Grade, ScoreRecord, ScoringPolicy};
