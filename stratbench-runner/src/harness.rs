//! Harness orchestration: discover, load, stress, score and aggregate.
//!
//! Units are processed one at a time, in discovery order, against a single
//! shared capability stub. A unit that fails to load is recorded and the run
//! moves on; only a failure to walk the strategy tree aborts the run.

use std::path::{Path, PathBuf};

use chrono::Utc;
use stratbench_core::{discover, load_unit, DiscoveryError, LoadError, RobustnessExecutor, StrategyUnit, StubHandle};
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{group_tag, RunSummary, UnitOutcome, UnitResult};
use crate::config::HarnessConfig;
use crate::quality::QualityScorer;
use crate::score::score_unit;

/// Fatal harness errors. Per-unit problems never surface here.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Progress callback for a harness run.
pub trait HarnessProgress: Send {
    /// Called before a unit is loaded.
    fn on_unit_start(&self, path: &Path, index: usize, total: usize);

    /// Called once the unit has a result.
    fn on_unit_complete(&self, result: &UnitResult, index: usize, total: usize);

    /// Called when every unit is done.
    fn on_run_complete(&self, summary: &RunSummary);
}

/// Prints one line per unit to stdout.
pub struct ConsolePrinter;

impl HarnessProgress for ConsolePrinter {
    fn on_unit_start(&self, path: &Path, index: usize, total: usize) {
        println!("[{}/{}] Testing {}...", index + 1, total, path.display());
    }

    fn on_unit_complete(&self, result: &UnitResult, _index: usize, _total: usize) {
        match &result.outcome {
            UnitOutcome::Scored { score, .. } => println!(
                "  {}: overall {:.2} (grade {}), robustness {:.2}, quality {:.2}",
                if result.passed() { "PASS" } else { "FAIL" },
                score.overall,
                score.grade,
                score.robustness,
                score.quality.overall
            ),
            UnitOutcome::LoadFailed { error } => println!("  ERROR: {error}"),
        }
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        println!(
            "\nRun complete: {}/{} passed, {} failed",
            summary.overall.passed, summary.overall.units, summary.overall.failed
        );
    }
}

/// Discards every event.
pub struct SilentProgress;

impl HarnessProgress for SilentProgress {
    fn on_unit_start(&self, _path: &Path, _index: usize, _total: usize) {}
    fn on_unit_complete(&self, _result: &UnitResult, _index: usize, _total: usize) {}
    fn on_run_complete(&self, _summary: &RunSummary) {}
}

/// Run the harness over every unit under the configured root.
pub fn run_harness(config: &HarnessConfig, progress: &dyn HarnessProgress) -> Result<RunSummary, HarnessError> {
    let started_at = Utc::now();
    let files = discover(&config.discovery.root, &config.discovery.extension)?;
    info!(
        root = %config.discovery.root.display(),
        units = files.len(),
        seed = config.scenarios.seed,
        "starting harness run"
    );

    let stub = StubHandle::new();
    let executor = RobustnessExecutor::new(&stub, config.scenarios.seed, config.scenarios.random_count);
    let scorer = QualityScorer::new(config.policy.quality);

    let total = files.len();
    let mut units = Vec::with_capacity(total);
    for (index, path) in files.iter().enumerate() {
        progress.on_unit_start(path, index, total);
        let result = evaluate_file(path, config, &stub, &executor, &scorer);
        progress.on_unit_complete(&result, index, total);
        units.push(result);
    }

    let fingerprint = run_fingerprint(config, &units);
    let summary = RunSummary::new(
        started_at,
        fingerprint,
        config.scenarios.seed,
        config.scenarios.random_count,
        units,
    );
    info!(
        passed = summary.overall.passed,
        failed = summary.overall.failed,
        mean_overall = summary.overall.mean_overall,
        "harness run complete"
    );
    progress.on_run_complete(&summary);
    Ok(summary)
}

/// Units discovery would pick up, each with its group tag.
pub fn discover_units(config: &HarnessConfig) -> Result<Vec<(String, PathBuf)>, HarnessError> {
    let files = discover(&config.discovery.root, &config.discovery.extension)?;
    Ok(files
        .into_iter()
        .map(|path| (unit_group(&path, config), path))
        .collect())
}

/// Groups match on the path below the strategy root.
fn unit_group(path: &Path, config: &HarnessConfig) -> String {
    let relative = path.strip_prefix(&config.discovery.root).unwrap_or(path);
    group_tag(relative, &config.groups)
}

fn evaluate_file(
    path: &Path,
    config: &HarnessConfig,
    stub: &StubHandle,
    executor: &RobustnessExecutor<'_>,
    scorer: &QualityScorer,
) -> UnitResult {
    let group = unit_group(path, config);
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let unit = match StrategyUnit::read(path) {
        Ok(unit) => unit,
        Err(error) => return load_failed(path, group, file, None, error),
    };
    let digest = unit.digest.clone();
    let unit_name = unit.name.clone();
    let quality = scorer.score(&unit.source);

    let strategy = match load_unit(unit, stub, &config.sandbox) {
        Ok(strategy) => strategy,
        Err(error) => return load_failed(path, group, file, Some(digest), error),
    };

    let robustness = executor.run(&strategy);
    let score = score_unit(&robustness, &quality, &config.policy);
    UnitResult {
        group,
        path: path.to_path_buf(),
        file,
        unit_name,
        digest: Some(digest),
        outcome: UnitOutcome::Scored { robustness, score },
    }
}

fn load_failed(path: &Path, group: String, file: String, digest: Option<String>, error: LoadError) -> UnitResult {
    warn!(path = %path.display(), %error, "unit failed to load");
    UnitResult {
        group,
        path: path.to_path_buf(),
        unit_name: path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
        file,
        digest,
        outcome: UnitOutcome::LoadFailed { error },
    }
}

/// BLAKE3 over the canonical config and each unit's path and digest.
pub fn run_fingerprint(config: &HarnessConfig, units: &[UnitResult]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(config.to_canonical_toml().as_bytes());
    for unit in units {
        hasher.update(unit.path.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(unit.digest.as_deref().unwrap_or("-").as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}
