//! Restricted interpreter for untrusted strategy units.
//!
//! Every unit gets its own [`rhai::Engine`] built here. The engine has no
//! module resolver (no filesystem access), no `eval`, bounded call depth,
//! expression depth, string/array/map sizes and operation count, and a
//! wall-clock [`Deadline`] checked from the progress callback. An expired
//! deadline terminates the running hook, which the caller reports as a
//! timeout fault.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Termination token returned from the progress callback.
pub const TIMEOUT_TOKEN: &str = "deadline exceeded";

/// Progress callbacks between clock reads.
const CLOCK_STRIDE: u64 = 64;

/// Resource limits for a unit's interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxPolicy {
    /// Wall-clock budget per hook call, in milliseconds.
    pub timeout_ms: u64,
    /// Interpreter operations per hook call.
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    /// Also applied to object maps.
    pub max_array_size: usize,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 250,
            max_operations: 2_000_000,
            max_call_levels: 32,
            max_expr_depth: 64,
            max_string_size: 64 * 1024,
            max_array_size: 10_000,
        }
    }
}

impl SandboxPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Deadline shared between the hook caller and the progress callback.
///
/// Armed around top-level load code and each hook call; disarmed otherwise.
#[derive(Debug, Clone, Default)]
pub struct Deadline(Rc<Cell<Option<Instant>>>);

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, budget: Duration) {
        self.0.set(Some(Instant::now() + budget));
    }

    pub fn disarm(&self) {
        self.0.set(None);
    }

    pub fn expired(&self) -> bool {
        self.0.get().map_or(false, |at| Instant::now() >= at)
    }
}

/// Build a locked-down engine for one unit.
pub fn build_engine(policy: &SandboxPolicy, deadline: &Deadline) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(policy.max_operations);
    engine.set_max_call_levels(policy.max_call_levels);
    engine.set_max_expr_depths(policy.max_expr_depth, policy.max_expr_depth);
    engine.set_max_string_size(policy.max_string_size);
    engine.set_max_array_size(policy.max_array_size);
    engine.set_max_map_size(policy.max_array_size);

    engine.set_module_resolver(DummyModuleResolver::new());
    engine.disable_symbol("eval");

    engine.on_print(|text| debug!(target: "stratbench::unit", "print: {text}"));
    engine.on_debug(|text, source, pos| {
        debug!(target: "stratbench::unit", source = source.unwrap_or(""), %pos, "debug: {text}");
    });

    let deadline = deadline.clone();
    engine.on_progress(move |ops| {
        if ops % CLOCK_STRIDE == 0 && deadline.expired() {
            Some(Dynamic::from(TIMEOUT_TOKEN.to_string()))
        } else {
            None
        }
    });

    engine
}
