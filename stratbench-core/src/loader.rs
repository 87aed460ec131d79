//! Strategy discovery and isolated loading.
//!
//! Discovery walks a directory tree for unit files. Loading gives each unit
//! its own sandboxed engine with the stub operations and capability markers
//! bound as ambient names, compiles the script, and runs its top-level code.
//!
//! Top-level code must register the unit explicitly:
//!
//! ```text
//! strategy("Strategy");
//!
//! fn initialize() { this.symbol = declare_trigger_symbol(); }
//! fn handle_data() { let price = get_price(this.symbol); }
//! ```
//!
//! The loader consults the registry filled by `strategy(...)` instead of
//! introspecting the script. Every failure is reported as a [`LoadError`]
//! for that one file; nothing propagates past it.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use rhai::{CallFnOptions, Dynamic, Engine, ImmutableString, Map, Scope, AST};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::capabilities::{bind_markers, bind_stub};
use crate::report::{ExecutionFault, ExecutionOutcome};
use crate::sandbox::{build_engine, Deadline, SandboxPolicy};
use crate::stub::StubHandle;

/// Name a unit must register under.
pub const REQUIRED_UNIT_NAME: &str = "Strategy";

/// Zero-argument hooks a unit must define.
pub const REQUIRED_HOOKS: [&str; 2] = ["initialize", "handle_data"];

/// Default unit file extension.
pub const DEFAULT_EXTENSION: &str = "rhai";

/// Fatal: the strategy tree itself could not be walked.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to walk strategy tree {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Per-file load failure. Recorded; the run continues.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum LoadError {
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("no strategy found")]
    NoStrategy,

    #[error("found unit '{found}', but the unit must be named '{expected}'")]
    NameMismatch { found: String, expected: String },

    #[error("more than one unit registered: {}", .names.join(", "))]
    Ambiguous { names: Vec<String> },

    #[error("unit '{name}' is missing hooks: {}", .missing.join(", "))]
    MissingHooks { name: String, missing: Vec<String> },

    #[error("loading failed: {0}")]
    Fault(String),
}

// ─── Discovery ───────────────────────────────────────────────────────

/// Recursively enumerate unit files under `root`, sorted by path.
///
/// Skips files whose name contains `test` (any case), files whose first
/// non-empty line starts with `{` or `[` (structured data), and unreadable
/// files. A missing root yields an empty list.
pub fn discover(root: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !root.exists() {
        warn!(root = %root.display(), "strategy root does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != extension) {
            continue;
        }
        if looks_like_test(path) {
            debug!(path = %path.display(), "skipping test file");
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(text) if looks_like_data(&text) => {
                debug!(path = %path.display(), "skipping structured data file");
            }
            Ok(_) => files.push(path.to_path_buf()),
            Err(err) => warn!(path = %path.display(), %err, "skipping unreadable file"),
        }
    }

    files.sort();
    Ok(files)
}

fn looks_like_test(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains("test"))
        .unwrap_or(false)
}

fn looks_like_data(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map_or(false, |line| line.starts_with('{') || line.starts_with('['))
}

// ─── Units ───────────────────────────────────────────────────────────

/// A discovered unit file. Never mutated after discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyUnit {
    pub path: PathBuf,
    /// File stem.
    pub name: String,
    pub source: String,
    /// BLAKE3 hex digest of `source`.
    pub digest: String,
}

impl StrategyUnit {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path = path.into();
        let source = source.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let digest = blake3::hash(source.as_bytes()).to_hex().to_string();
        Self {
            path,
            name,
            source,
            digest,
        }
    }

    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|e| LoadError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(path, source))
    }
}

/// Distinct names registered through `strategy(...)`.
///
/// Top-level code reruns ahead of every hook call, so repeated registration
/// of the same name is a no-op.
#[derive(Debug, Clone, Default)]
struct UnitRegistry(Rc<RefCell<Vec<String>>>);

impl UnitRegistry {
    fn bind(&self, engine: &mut Engine) {
        let registry = self.clone();
        engine.register_fn("strategy", move |name: ImmutableString| {
            let mut names = registry.0.borrow_mut();
            if !names.iter().any(|known| known == name.as_str()) {
                names.push(name.to_string());
            }
        });
    }

    fn names(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

/// A unit bound to its sandbox, ready to instantiate.
pub struct LoadedStrategy {
    unit: StrategyUnit,
    engine: Engine,
    ast: AST,
    deadline: Deadline,
    timeout: Duration,
}

impl std::fmt::Debug for LoadedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedStrategy")
            .field("unit", &self.unit.path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LoadedStrategy {
    pub fn unit(&self) -> &StrategyUnit {
        &self.unit
    }

    /// Construct a fresh instance with empty state.
    pub fn instantiate(&self) -> StrategyInstance<'_> {
        StrategyInstance {
            strategy: self,
            this: Dynamic::from_map(Map::new()),
            scope: Scope::new(),
        }
    }
}

/// One transient instance of a unit. Hook calls share `this`.
pub struct StrategyInstance<'a> {
    strategy: &'a LoadedStrategy,
    this: Dynamic,
    scope: Scope<'static>,
}

impl StrategyInstance<'_> {
    pub fn initialize(&mut self) -> ExecutionOutcome {
        self.call_hook("initialize")
    }

    pub fn handle_data(&mut self) -> ExecutionOutcome {
        self.call_hook("handle_data")
    }

    /// Instance state as seen by the script.
    pub fn state(&self) -> &Dynamic {
        &self.this
    }

    /// Top-level statements run first so `global::` constants resolve
    /// inside the hook.
    fn call_hook(&mut self, hook: &str) -> ExecutionOutcome {
        let strategy = self.strategy;
        let options = CallFnOptions::new()
            .eval_ast(true)
            .rewind_scope(true)
            .bind_this_ptr(&mut self.this);

        strategy.deadline.arm(strategy.timeout);
        let result = strategy
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut self.scope, &strategy.ast, hook, ());
        strategy.deadline.disarm();

        result
            .map(|_| ())
            .map_err(|err| ExecutionFault::from_eval(hook, &err))
    }
}

// ─── Loading ─────────────────────────────────────────────────────────

/// Read and load the unit at `path`.
pub fn load(path: &Path, stub: &StubHandle, policy: &SandboxPolicy) -> Result<LoadedStrategy, LoadError> {
    load_unit(StrategyUnit::read(path)?, stub, policy)
}

/// Load an already-read unit.
pub fn load_unit(unit: StrategyUnit, stub: &StubHandle, policy: &SandboxPolicy) -> Result<LoadedStrategy, LoadError> {
    let deadline = Deadline::new();
    let mut engine = build_engine(policy, &deadline);
    bind_markers(&mut engine);
    bind_stub(&mut engine, stub);

    let registry = UnitRegistry::default();
    registry.bind(&mut engine);

    let ast = engine
        .compile(&unit.source)
        .map_err(|e| LoadError::Fault(format!("syntax error: {e}")))?;

    // Top-level code runs against a clean stub and must stay inside the budget
    stub.reset();
    deadline.arm(policy.timeout());
    let outcome = engine.run_ast_with_scope(&mut Scope::new(), &ast);
    deadline.disarm();
    stub.reset();
    outcome.map_err(|e| LoadError::Fault(ExecutionFault::from_eval("<top-level>", &e).to_string()))?;

    let name = match registry.names().as_slice() {
        [] => return Err(LoadError::NoStrategy),
        [name] => name.clone(),
        names => {
            return Err(LoadError::Ambiguous {
                names: names.to_vec(),
            })
        }
    };
    if name != REQUIRED_UNIT_NAME {
        return Err(LoadError::NameMismatch {
            found: name,
            expected: REQUIRED_UNIT_NAME.to_string(),
        });
    }

    let missing: Vec<String> = REQUIRED_HOOKS
        .iter()
        .filter(|hook| {
            !ast.iter_functions()
                .any(|f| f.name == **hook && f.params.is_empty())
        })
        .map(|hook| hook.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingHooks { name, missing });
    }

    debug!(path = %unit.path.display(), digest = %unit.digest, "unit loaded");
    Ok(LoadedStrategy {
        unit,
        engine,
        ast,
        deadline,
        timeout: policy.timeout(),
    })
}
