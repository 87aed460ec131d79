//! End-to-end harness runs over a strategy tree on disk: discovery through
//! scoring, aggregation and report emission.

use std::fs;
use std::path::Path;

use stratbench_runner::{
    discover_units, emit, render_csv, render_text, run_harness, GroupRule, HarnessConfig, SilentProgress,
    UnitOutcome, CSV_HEADER,
};
use tempfile::TempDir;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const GUARDED: &str = r#"
//! Buys below the 20-day average when RSI is oversold.
strategy("Strategy");

/// Declare the trigger symbol.
fn initialize() {
    declare_strategy_kind(StrategyKind::SECURITY);
    this.symbol = declare_trigger_symbol();
}

/// Buy one lot when oversold and flat.
fn handle_data() {
    let last_price = get_price(this.symbol);
    let moving_avg = get_moving_average(this.symbol, 20, BarType::D1);
    let rsi_value = get_rsi(this.symbol, 14, BarType::D1);
    if last_price == () || moving_avg == () || rsi_value == () {
        return;
    }
    if last_price < moving_avg && get_position_qty(this.symbol) == 0 {
        submit_limit_order(this.symbol, last_price, 100, OrderSide::BUY, TimeInForce::DAY, TradeSession::RTH);
    }
}
"#;

const FRAGILE: &str = r#"
strategy("Strategy");
fn initialize() { this.symbol = declare_trigger_symbol(); }
fn handle_data() {
    let target = get_price(this.symbol) * 2.0;
    emit_alert("target " + target);
}
"#;

const WRONG_NAME: &str = r#"
strategy("Momentum");
fn initialize() {}
fn handle_data() {}
"#;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

fn config_for(root: &Path) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.discovery.root = root.join("strategies");
    config.scenarios.random_count = 10;
    config.output.report_path = root.join("out/report.txt");
    config.output.csv_path = root.join("out/scores.csv");
    config.output.json_path = Some(root.join("out/run.json"));
    config
}

fn tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "strategies/gpt/guarded.rhai", GUARDED);
    write(dir.path(), "strategies/gemini/fragile.rhai", FRAGILE);
    write(dir.path(), "strategies/deepseek/misnamed.rhai", WRONG_NAME);
    dir
}

// ──────────────────────────────────────────────
// Runs
// ──────────────────────────────────────────────

#[test]
fn full_run_scores_loads_and_groups() {
    let dir = tree();
    let summary = run_harness(&config_for(dir.path()), &SilentProgress).unwrap();

    let files: Vec<_> = summary.units.iter().map(|u| u.file.as_str()).collect();
    assert_eq!(files, ["misnamed.rhai", "fragile.rhai", "guarded.rhai"]);

    assert!(matches!(summary.units[0].outcome, UnitOutcome::LoadFailed { .. }));

    let fragile = summary.units[1].robustness().unwrap();
    assert!(fragile.initialize_passed);
    assert_eq!(fragile.boundary.fail_count, 62);
    assert!(!summary.units[1].passed());

    let guarded = summary.units[2].score().unwrap();
    assert_eq!(guarded.robustness, 100.0);
    assert!(summary.units[2].passed());
    assert!(guarded.overall > summary.units[1].score().unwrap().overall);

    assert_eq!(summary.overall.units, 3);
    assert_eq!(summary.overall.scored, 2);
    assert_eq!(summary.overall.passed, 1);
    assert_eq!(summary.overall.failed, 2);
    let tags: Vec<_> = summary.groups.iter().map(|g| g.tag.as_str()).collect();
    assert_eq!(tags, ["deepseek", "gemini", "gpt"]);
    assert_eq!(summary.exit_status(), 1);
}

#[test]
fn identical_inputs_give_identical_results() {
    let dir = tree();
    let config = config_for(dir.path());
    let a = run_harness(&config, &SilentProgress).unwrap();
    let b = run_harness(&config, &SilentProgress).unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.units, b.units);
    assert_eq!(render_csv(&a).unwrap(), render_csv(&b).unwrap());
}

#[test]
fn only_clean_units_exit_zero() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "strategies/gpt/guarded.rhai", GUARDED);
    let summary = run_harness(&config_for(dir.path()), &SilentProgress).unwrap();
    assert_eq!(summary.exit_status(), 0);
}

#[test]
fn listing_follows_configured_groups_and_extension() {
    let dir = tree();
    write(dir.path(), "strategies/gpt/legacy.strat", GUARDED);
    let mut config = config_for(dir.path());

    let listed: Vec<_> = discover_units(&config)
        .unwrap()
        .into_iter()
        .map(|(group, path)| (group, path.file_name().unwrap().to_string_lossy().to_string()))
        .collect();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0], ("deepseek".to_string(), "misnamed.rhai".to_string()));

    config.discovery.extension = "strat".into();
    config.groups = vec![GroupRule::new("legacy", &["legacy"])];
    let listed = discover_units(&config).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].0, "legacy");
}

// ──────────────────────────────────────────────
// Reports
// ──────────────────────────────────────────────

#[test]
fn csv_lists_scored_units_in_order() {
    let dir = tree();
    let summary = run_harness(&config_for(dir.path()), &SilentProgress).unwrap();
    let csv = render_csv(&summary).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("gemini,fragile.rhai,fragile,"));
    assert!(lines[2].starts_with("gpt,guarded.rhai,guarded,"));
}

#[test]
fn text_report_names_every_unit() {
    let dir = tree();
    let summary = run_harness(&config_for(dir.path()), &SilentProgress).unwrap();
    let text = render_text(&summary);
    assert!(text.contains("misnamed.rhai"));
    assert!(text.contains("must be named 'Strategy'"));
    assert!(text.contains("fragile.rhai"));
    assert!(text.contains("guarded.rhai"));
    assert!(text.contains("GROUP SUMMARY"));
}

#[test]
fn emit_writes_configured_artifacts() {
    let dir = tree();
    let config = config_for(dir.path());
    let summary = run_harness(&config, &SilentProgress).unwrap();
    let written = emit(&summary, &config.output).unwrap();
    assert_eq!(written.len(), 3);
    let json = fs::read_to_string(dir.path().join("out/run.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["units"].as_array().unwrap().len(), 3);
    assert_eq!(value["units"][0]["outcome"]["status"], "load_failed");
}

// ──────────────────────────────────────────────
// Shipped tree
// ──────────────────────────────────────────────

fn workspace_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap()
}

#[test]
fn shipped_config_matches_defaults() {
    let config = HarnessConfig::from_file(&workspace_root().join("stratbench.toml")).unwrap();
    assert_eq!(config, HarnessConfig::default());
}

#[test]
fn shipped_strategies_run() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(dir.path());
    config.discovery.root = workspace_root().join("strategies");
    let summary = run_harness(&config, &SilentProgress).unwrap();

    let by_file = |name: &str| summary.units.iter().find(|u| u.file == name).unwrap();
    assert_eq!(summary.units.len(), 6);
    assert!(matches!(
        &by_file("tsla_scalper.rhai").outcome,
        UnitOutcome::LoadFailed { error: stratbench_core::LoadError::NameMismatch { .. } }
    ));
    assert!(!by_file("tsla_breakout.rhai").passed());
    assert!(by_file("nvda_mean_reversion.rhai").passed());
    assert!(by_file("nvda_trend.rhai").passed());
    assert_eq!(by_file("nvda_trend.rhai").group, "deepseek");
}
