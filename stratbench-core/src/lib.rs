//! StratBench Core: the pieces that touch untrusted strategy units.
//!
//! - `stub`: deterministic stand-in for the trading environment
//! - `scenario`: boundary sentinels and seeded random cases
//! - `sandbox` + `capabilities`: the restricted interpreter and its bindings
//! - `loader`: discovery and isolated loading
//! - `executor`: the fault-tolerant robustness loop
//! - `report`: outcomes, phase counts and the robustness score

pub mod capabilities;
pub mod executor;
pub mod loader;
pub mod report;
pub mod sandbox;
pub mod scenario;
pub mod stub;

pub use executor::RobustnessExecutor;
pub use loader::{
    discover, load, load_unit, DiscoveryError, LoadError, LoadedStrategy, StrategyInstance, StrategyUnit,
    DEFAULT_EXTENSION, REQUIRED_HOOKS, REQUIRED_UNIT_NAME,
};
pub use report::{
    robustness_score, round2, ExecutionFault, ExecutionOutcome, FaultKind, PhaseReport, PhaseWeights,
    RobustnessReport,
};
pub use sandbox::SandboxPolicy;
pub use scenario::{boundary_cases, random_cases, RandomPlan, ScenarioCase};
pub use stub::{CapabilityStub, StubHandle, DEFAULT_SYMBOL};
