//! Robustness executor: drives a loaded unit through every scenario.
//!
//! The run order per unit:
//! 1. Reset the stub, construct an instance, call `initialize` once. A fault
//!    here is recorded but the phases still run, against the declared symbol
//!    or the default one.
//! 2. Boundary phase: every boundary case at positions 0, +100, -100.
//! 3. Random phase: every random case at its drawn position.
//!
//! Each case gets a fresh stub state and a fresh instance. A case passes only
//! if setup and every position pass. No fault ever escapes a case.

use tracing::{debug, info};

use crate::loader::LoadedStrategy;
use crate::report::{PhaseReport, RobustnessReport};
use crate::scenario::{boundary_cases, RandomPlan, ScenarioCase, BOUNDARY_POSITIONS};
use crate::stub::{StubHandle, DEFAULT_SYMBOL};

/// Runs scenarios against units, reusing the generated cases across units.
#[derive(Debug)]
pub struct RobustnessExecutor<'s> {
    stub: &'s StubHandle,
    boundary: Vec<ScenarioCase>,
    plan: RandomPlan,
}

impl<'s> RobustnessExecutor<'s> {
    pub fn new(stub: &'s StubHandle, seed: u64, random_count: usize) -> Self {
        Self {
            stub,
            boundary: boundary_cases(),
            plan: RandomPlan::generate(random_count, seed),
        }
    }

    pub fn boundary_cases(&self) -> &[ScenarioCase] {
        &self.boundary
    }

    pub fn random_plan(&self) -> &RandomPlan {
        &self.plan
    }

    /// Run both phases and return the report. Never fails.
    pub fn run(&self, strategy: &LoadedStrategy) -> RobustnessReport {
        let unit = &strategy.unit().name;

        self.stub.reset();
        let mut instance = strategy.instantiate();
        let (initialize_passed, initialize_error) = match instance.initialize() {
            Ok(()) => (true, None),
            Err(fault) => {
                debug!(unit = %unit, %fault, "initialize failed");
                (false, Some(fault.to_string()))
            }
        };
        let symbol = self
            .stub
            .declared_symbol()
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
        drop(instance);

        let boundary = self.run_phase(
            strategy,
            &symbol,
            self.boundary.iter().map(|case| (case, &BOUNDARY_POSITIONS[..])),
        );
        let random = self.run_phase(
            strategy,
            &symbol,
            self.plan
                .cases
                .iter()
                .zip(self.plan.positions.chunks(1)),
        );

        info!(
            unit = %unit,
            initialize = initialize_passed,
            boundary_passed = boundary.pass_count,
            boundary_total = boundary.test_count,
            random_passed = random.pass_count,
            random_total = random.test_count,
            "robustness run complete"
        );

        RobustnessReport {
            initialize_passed,
            initialize_error,
            symbol,
            boundary,
            random,
        }
    }

    fn run_phase<'c>(
        &self,
        strategy: &LoadedStrategy,
        symbol: &str,
        cases: impl Iterator<Item = (&'c ScenarioCase, &'c [i64])>,
    ) -> PhaseReport {
        let mut phase = PhaseReport::default();
        for (case, positions) in cases {
            phase.record_case(self.run_case(strategy, symbol, case, positions));
        }
        phase
    }

    /// Fault messages for one case; empty means it passed.
    fn run_case(
        &self,
        strategy: &LoadedStrategy,
        symbol: &str,
        case: &ScenarioCase,
        positions: &[i64],
    ) -> Vec<String> {
        self.stub.reset();
        let mut instance = strategy.instantiate();
        if let Err(fault) = instance.initialize() {
            // A unit whose initialize always raises fails every case here
            return vec![format!("Test case '{}' setup failed: {fault}", case.name)];
        }
        self.stub.with_mut(|stub| stub.apply_case(symbol, case));

        let mut faults = Vec::new();
        for &position in positions {
            self.stub.with_mut(|stub| stub.set_position_qty(symbol, position));
            if let Err(fault) = instance.handle_data() {
                debug!(case = %case.name, position, %fault, "handle_data fault");
                faults.push(format!(
                    "Test case '{}' (position={position}) execution failed: {fault}",
                    case.name
                ));
            }
        }
        faults
    }
}
