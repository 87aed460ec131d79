//! StratBench CLI: run, score, list and scenarios commands.
//!
//! Commands:
//! - `run` runs the full harness and writes the text, CSV and JSON reports
//! - `score` prints the static quality breakdown of one unit file
//! - `list` shows the units discovery would pick up, with their groups
//! - `scenarios` prints the generated boundary and random cases
//!
//! Exit status: 0 when every unit passed, 1 when any unit failed or did not
//! load, 2 on a fatal error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stratbench_core::scenario::{DEFAULT_RANDOM_COUNT, DEFAULT_SEED};
use stratbench_core::{boundary_cases, RandomPlan, ScenarioCase};
use stratbench_runner::{
    discover_units, emit, recommendations, render_quality, run_harness, ConsolePrinter, HarnessConfig,
    QualityScorer,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stratbench",
    about = "StratBench: robustness and quality harness for strategy scripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test and score every unit under the strategy root.
    Run {
        /// Path to a TOML harness config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy root directory (overrides the config).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Seed for the random scenario phase.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of random cases.
        #[arg(long)]
        random_count: Option<usize>,

        /// Text report path.
        #[arg(long)]
        report: Option<PathBuf>,

        /// CSV score table path.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Also write the full run as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the static quality breakdown for one unit file.
    Score {
        /// Unit file to score.
        file: PathBuf,

        /// Path to a TOML harness config, for the quality weights.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the units discovery would pick up.
    List {
        /// Path to a TOML harness config, for discovery and groups.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy root directory (overrides the config).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Unit file extension (overrides the config).
        #[arg(long)]
        extension: Option<String>,
    },
    /// Print the generated scenario cases.
    Scenarios {
        /// Seed for the random phase.
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Number of random cases.
        #[arg(long, default_value_t = DEFAULT_RANDOM_COUNT)]
        count: usize,

        /// Also list every boundary case.
        #[arg(long, default_value_t = false)]
        boundary: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let status = match dispatch(cli) {
        Ok(status) => status,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            2
        }
    };
    std::process::exit(status);
}

/// Logs go to stderr. `RUST_LOG` sets the filter; `STRATBENCH_LOG_JSON`
/// switches to JSON lines.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stratbench=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if std::env::var_os("STRATBENCH_LOG_JSON").is_some() {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run {
            config,
            root,
            seed,
            random_count,
            report,
            csv,
            json,
        } => {
            let mut harness = load_config(config.as_ref())?;
            if let Some(root) = root {
                harness.discovery.root = root;
            }
            if let Some(seed) = seed {
                harness.scenarios.seed = seed;
            }
            if let Some(count) = random_count {
                harness.scenarios.random_count = count;
            }
            if let Some(report) = report {
                harness.output.report_path = report;
            }
            if let Some(csv) = csv {
                harness.output.csv_path = csv;
            }
            if json.is_some() {
                harness.output.json_path = json;
            }
            harness.validate().context("invalid harness settings")?;
            run_cmd(&harness)
        }
        Commands::Score { file, config } => {
            let harness = load_config(config.as_ref())?;
            score_cmd(&file, &harness).map(|()| 0)
        }
        Commands::List {
            config,
            root,
            extension,
        } => {
            let mut harness = load_config(config.as_ref())?;
            if let Some(root) = root {
                harness.discovery.root = root;
            }
            if let Some(extension) = extension {
                harness.discovery.extension = extension;
            }
            list_cmd(&harness).map(|()| 0)
        }
        Commands::Scenarios { seed, count, boundary } => {
            scenarios_cmd(seed, count, boundary);
            Ok(0)
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    match path {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(HarnessConfig::default()),
    }
}

fn run_cmd(config: &HarnessConfig) -> Result<i32> {
    println!("Strategy root: {}", config.discovery.root.display());
    println!(
        "Scenarios: seed {}, {} random cases\n",
        config.scenarios.seed, config.scenarios.random_count
    );

    let summary = run_harness(config, &ConsolePrinter).context("harness run failed")?;
    if summary.units.is_empty() {
        println!("No strategy units found.");
    }

    let written = emit(&summary, &config.output).context("failed to write reports")?;
    for path in &written {
        println!("Wrote {}", path.display());
    }
    println!("Run fingerprint: {}", summary.fingerprint);

    Ok(summary.exit_status())
}

fn score_cmd(file: &Path, config: &HarnessConfig) -> Result<()> {
    let source =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let quality = QualityScorer::new(config.policy.quality).score(&source);

    println!("{}", file.display());
    print!("{}", render_quality(&quality));
    let recs = recommendations(None, &quality);
    if recs.is_empty() {
        println!("  No major issues found.");
    }
    for rec in recs {
        println!("  - {rec}");
    }
    Ok(())
}

fn list_cmd(config: &HarnessConfig) -> Result<()> {
    let units = discover_units(config).context("discovery failed")?;
    for (group, path) in &units {
        println!("{group:<10} {}", path.display());
    }
    println!("\n{} unit(s) under {}", units.len(), config.discovery.root.display());
    Ok(())
}

fn scenarios_cmd(seed: u64, count: usize, show_boundary: bool) {
    let boundary = boundary_cases();
    println!("Boundary cases: {}", boundary.len());
    if show_boundary {
        for case in &boundary {
            println!("  {}", describe(case));
        }
    }

    let plan = RandomPlan::generate(count, seed);
    println!("\nRandom cases (seed {seed}): {}", plan.len());
    for (case, position) in plan.iter() {
        println!("  {:<60} position={position}", describe(case));
    }
}

fn describe(case: &ScenarioCase) -> String {
    let value = |v: Option<f64>| v.map_or_else(|| "absent".to_string(), |v| format!("{v}"));
    format!(
        "{}: price={} ma={} rsi={}",
        case.name,
        value(case.price),
        value(case.moving_average),
        value(case.rsi)
    )
}
