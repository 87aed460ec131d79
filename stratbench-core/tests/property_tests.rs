//! Property tests for scenario and report invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism: the same seed yields bit-identical cases and positions
//! 2. Random values stay in their documented ranges
//! 3. Phase counts always add up
//! 4. Robustness scores stay within [0, 100]

use proptest::prelude::*;
use stratbench_core::report::{robustness_score, PhaseReport, PhaseWeights, RobustnessReport};
use stratbench_core::scenario::{random_cases, RandomPlan, RANDOM_POSITIONS};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_outcomes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..4, 0..60)
}

fn phase_from(outcomes: &[usize]) -> PhaseReport {
    let mut phase = PhaseReport::default();
    for &faults in outcomes {
        phase.record_case((0..faults).map(|i| format!("fault {i}")).collect());
    }
    phase
}

// ── 1. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn same_seed_same_plan(seed in any::<u64>(), count in 0usize..80) {
        let a = RandomPlan::generate(count, seed);
        let b = RandomPlan::generate(count, seed);
        let fa: Vec<_> = a.cases.iter().map(|c| c.fingerprint()).collect();
        let fb: Vec<_> = b.cases.iter().map(|c| c.fingerprint()).collect();
        prop_assert_eq!(fa, fb);
        prop_assert_eq!(a.positions, b.positions);
    }

    #[test]
    fn plan_positions_come_from_the_fixed_set(seed in any::<u64>(), count in 1usize..80) {
        let plan = RandomPlan::generate(count, seed);
        prop_assert_eq!(plan.positions.len(), count);
        prop_assert!(plan.positions.iter().all(|p| RANDOM_POSITIONS.contains(p)));
    }
}

// ── 2. Ranges ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn random_fields_in_range(seed in any::<u64>()) {
        for case in random_cases(40, seed) {
            if let Some(rsi) = case.rsi {
                prop_assert!((0.0..=100.0).contains(&rsi));
            }
            if let Some(price) = case.price.filter(|p| !p.is_nan()) {
                prop_assert!((10.0..=1000.0).contains(&price));
            }
            prop_assert!(case.name.starts_with("random_case_"));
        }
    }
}

// ── 3. Counts ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn pass_plus_fail_is_test_count(outcomes in arb_outcomes()) {
        let phase = phase_from(&outcomes);
        prop_assert_eq!(phase.pass_count + phase.fail_count, phase.test_count);
        prop_assert_eq!(phase.test_count, outcomes.len());
        prop_assert!(phase.faults.len() <= 10);
    }
}

// ── 4. Score bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn robustness_score_is_bounded(
        boundary in arb_outcomes(),
        random in arb_outcomes(),
        init in any::<bool>(),
        w_b in 0.0..2.0_f64,
        w_r in 0.0..2.0_f64,
    ) {
        let report = RobustnessReport {
            initialize_passed: init,
            initialize_error: None,
            symbol: "TEST_SYMBOL".into(),
            boundary: phase_from(&boundary),
            random: phase_from(&random),
        };
        let score = robustness_score(&report, &PhaseWeights { boundary: w_b, random: w_r });
        prop_assert!((0.0..=100.0).contains(&score));
        if !init {
            prop_assert_eq!(score, 0.0);
        }
    }
}
