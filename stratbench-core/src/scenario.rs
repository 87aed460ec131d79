//! Scenario generation: boundary sentinels and seeded random cases.
//!
//! Both families are pure functions of their parameters. The random family
//! reseeds a `StdRng` on every call, so the same seed always produces the same
//! cases and the same position schedule, bit for bit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Sentinel values crossed over (price, moving average, RSI).
pub const BOUNDARY_SENTINELS: [Option<f64>; 10] = [
    None,
    Some(f64::NAN),
    Some(f64::INFINITY),
    Some(f64::NEG_INFINITY),
    Some(0.0),
    Some(-1.0),
    Some(1e10),
    Some(-1e10),
    Some(1e-10),
    Some(-1e-10),
];

/// Position states exercised for every boundary case, in order.
pub const BOUNDARY_POSITIONS: [i64; 3] = [0, 100, -100];

/// Position states the random phase draws from.
pub const RANDOM_POSITIONS: [i64; 5] = [0, 50, 100, 200, -50];

/// Default seed for the random phase.
pub const DEFAULT_SEED: u64 = 42;

/// Default number of random cases.
pub const DEFAULT_RANDOM_COUNT: usize = 50;

const PRICE_RANGE: (f64, f64) = (10.0, 1000.0);
const MA_FACTOR_RANGE: (f64, f64) = (0.8, 1.2);
const RSI_RANGE: (f64, f64) = (0.0, 100.0);
const ABSENT_PROBABILITY: f64 = 0.10;
const NAN_PROBABILITY: f64 = 0.05;

/// One named combination of (price, moving average, RSI).
///
/// Each field is independently absent, NaN, infinite, or finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCase {
    pub name: String,
    pub price: Option<f64>,
    pub moving_average: Option<f64>,
    pub rsi: Option<f64>,
}

impl ScenarioCase {
    pub fn new(name: impl Into<String>, price: Option<f64>, moving_average: Option<f64>, rsi: Option<f64>) -> Self {
        Self {
            name: name.into(),
            price,
            moving_average,
            rsi,
        }
    }

    /// True when RSI is absent, non-finite, or inside [0, 100].
    pub fn rsi_in_domain(&self) -> bool {
        match self.rsi {
            Some(v) if v.is_finite() => (0.0..=100.0).contains(&v),
            _ => true,
        }
    }

    /// Field values as raw bits, for exact comparison (NaN-safe).
    pub fn fingerprint(&self) -> [Option<u64>; 3] {
        [
            self.price.map(f64::to_bits),
            self.moving_average.map(f64::to_bits),
            self.rsi.map(f64::to_bits),
        ]
    }
}

fn fmt_field(value: Option<f64>) -> String {
    match value {
        None => "None".to_string(),
        Some(v) => format!("{v:?}"),
    }
}

/// Full boundary set: the filtered sentinel cross product followed by the
/// named edge cases.
pub fn boundary_cases() -> Vec<ScenarioCase> {
    let mut cases = Vec::with_capacity(BOUNDARY_SENTINELS.len().pow(3) + 16);

    for price in BOUNDARY_SENTINELS {
        for ma in BOUNDARY_SENTINELS {
            for rsi in BOUNDARY_SENTINELS {
                let case = ScenarioCase::new(
                    format!("price={}, ma={}, rsi={}", fmt_field(price), fmt_field(ma), fmt_field(rsi)),
                    price,
                    ma,
                    rsi,
                );
                // Finite RSI outside [0, 100] is meaningless input; skip it
                if case.rsi_in_domain() {
                    cases.push(case);
                }
            }
        }
    }

    cases.extend(named_edge_cases());
    cases
}

/// Hand-picked edge cases appended after the cross product.
///
/// `rsi_negative` and `rsi_over_100` are deliberately out of range: they check
/// that units cope with whatever the environment passes through.
pub fn named_edge_cases() -> Vec<ScenarioCase> {
    let nan = f64::NAN;
    let inf = f64::INFINITY;
    vec![
        ScenarioCase::new("normal_values", Some(100.0), Some(95.0), Some(50.0)),
        ScenarioCase::new("price_none", None, Some(95.0), Some(50.0)),
        ScenarioCase::new("ma_none", Some(100.0), None, Some(50.0)),
        ScenarioCase::new("rsi_none", Some(100.0), Some(95.0), None),
        ScenarioCase::new("all_none", None, None, None),
        ScenarioCase::new("price_nan", Some(nan), Some(95.0), Some(50.0)),
        ScenarioCase::new("price_inf", Some(inf), Some(95.0), Some(50.0)),
        ScenarioCase::new("price_neg_inf", Some(-inf), Some(95.0), Some(50.0)),
        ScenarioCase::new("price_zero", Some(0.0), Some(95.0), Some(50.0)),
        ScenarioCase::new("price_negative", Some(-10.0), Some(95.0), Some(50.0)),
        ScenarioCase::new("ma_nan", Some(100.0), Some(nan), Some(50.0)),
        ScenarioCase::new("rsi_nan", Some(100.0), Some(95.0), Some(nan)),
        ScenarioCase::new("rsi_boundary_0", Some(100.0), Some(95.0), Some(0.0)),
        ScenarioCase::new("rsi_boundary_100", Some(100.0), Some(95.0), Some(100.0)),
        ScenarioCase::new("rsi_negative", Some(100.0), Some(95.0), Some(-10.0)),
        ScenarioCase::new("rsi_over_100", Some(100.0), Some(95.0), Some(150.0)),
    ]
}

/// Random cases plus the position drawn for each, from one seeded stream.
///
/// Positions are drawn after all cases, continuing the same stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomPlan {
    pub seed: u64,
    pub cases: Vec<ScenarioCase>,
    pub positions: Vec<i64>,
}

impl RandomPlan {
    pub fn generate(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let cases = draw_cases(&mut rng, count);
        let positions = (0..count)
            .map(|_| RANDOM_POSITIONS[rng.gen_range(0..RANDOM_POSITIONS.len())])
            .collect();
        Self { seed, cases, positions }
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Iterate `(case, position)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioCase, i64)> {
        self.cases.iter().zip(self.positions.iter().copied())
    }
}

/// `count` random cases from a freshly seeded stream.
pub fn random_cases(count: usize, seed: u64) -> Vec<ScenarioCase> {
    let mut rng = StdRng::seed_from_u64(seed);
    draw_cases(&mut rng, count)
}

fn draw_cases(rng: &mut StdRng, count: usize) -> Vec<ScenarioCase> {
    (1..=count)
        .map(|i| {
            let price = rng.gen_range(PRICE_RANGE.0..=PRICE_RANGE.1);
            let ma = price * rng.gen_range(MA_FACTOR_RANGE.0..=MA_FACTOR_RANGE.1);
            let rsi = rng.gen_range(RSI_RANGE.0..=RSI_RANGE.1);

            let mut price = Some(price);
            let mut ma = Some(ma);
            let mut rsi = Some(rsi);

            if rng.gen_bool(ABSENT_PROBABILITY) {
                price = None;
            }
            if rng.gen_bool(ABSENT_PROBABILITY) {
                ma = None;
            }
            if rng.gen_bool(ABSENT_PROBABILITY) {
                rsi = None;
            }
            // NaN replaces the value even when it was nulled above
            if rng.gen_bool(NAN_PROBABILITY) {
                price = Some(f64::NAN);
            }
            if rng.gen_bool(NAN_PROBABILITY) {
                ma = Some(f64::NAN);
            }

            ScenarioCase::new(format!("random_case_{i}"), price, ma, rsi)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_set_has_expected_size() {
        // 10 prices x 10 MAs x 6 in-domain RSI sentinels + 16 named cases
        assert_eq!(boundary_cases().len(), 10 * 10 * 6 + 16);
    }

    #[test]
    fn cross_product_rsi_is_in_domain() {
        let cases = boundary_cases();
        let cross = &cases[..cases.len() - named_edge_cases().len()];
        assert!(cross.iter().all(ScenarioCase::rsi_in_domain));
    }

    #[test]
    fn named_cases_keep_out_of_range_rsi() {
        let cases = boundary_cases();
        let over = cases.iter().find(|c| c.name == "rsi_over_100").unwrap();
        assert_eq!(over.rsi, Some(150.0));
        assert!(!over.rsi_in_domain());
    }

    #[test]
    fn boundary_names_render_sentinels() {
        let cases = boundary_cases();
        assert_eq!(cases[0].name, "price=None, ma=None, rsi=None");
        assert!(cases.iter().any(|c| c.name == "price=NaN, ma=inf, rsi=0.0"));
    }

    #[test]
    fn random_cases_are_deterministic() {
        let a = random_cases(100, 7);
        let b = random_cases(100, 7);
        let fa: Vec<_> = a.iter().map(ScenarioCase::fingerprint).collect();
        let fb: Vec<_> = b.iter().map(ScenarioCase::fingerprint).collect();
        assert_eq!(fa, fb);
    }

    #[test]
    fn random_cases_differ_across_seeds() {
        let a: Vec<_> = random_cases(20, 1).iter().map(ScenarioCase::fingerprint).collect();
        let b: Vec<_> = random_cases(20, 2).iter().map(ScenarioCase::fingerprint).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn random_case_names_are_one_based() {
        let cases = random_cases(3, DEFAULT_SEED);
        let names: Vec<_> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["random_case_1", "random_case_2", "random_case_3"]);
    }

    #[test]
    fn random_values_stay_in_range() {
        for case in random_cases(500, DEFAULT_SEED) {
            if let Some(p) = case.price.filter(|p| !p.is_nan()) {
                assert!((10.0..=1000.0).contains(&p));
            }
            if let Some(r) = case.rsi {
                assert!((0.0..=100.0).contains(&r));
            }
            if let (Some(p), Some(m)) = (case.price, case.moving_average) {
                if !p.is_nan() && !m.is_nan() {
                    assert!(m >= p * 0.8 - 1e-9 && m <= p * 1.2 + 1e-9);
                }
            }
        }
    }

    #[test]
    fn random_set_contains_absent_and_nan_values() {
        let cases = random_cases(500, DEFAULT_SEED);
        assert!(cases.iter().any(|c| c.price.is_none()));
        assert!(cases.iter().any(|c| c.rsi.is_none()));
        assert!(cases.iter().any(|c| c.price.map_or(false, f64::is_nan)));
        assert!(cases.iter().any(|c| c.moving_average.map_or(false, f64::is_nan)));
    }

    #[test]
    fn plan_cases_match_standalone_generation() {
        let plan = RandomPlan::generate(30, 42);
        let standalone: Vec<_> = random_cases(30, 42).iter().map(ScenarioCase::fingerprint).collect();
        let planned: Vec<_> = plan.cases.iter().map(ScenarioCase::fingerprint).collect();
        assert_eq!(planned, standalone);
        assert_eq!(plan.positions.len(), 30);
        assert!(plan.positions.iter().all(|p| RANDOM_POSITIONS.contains(p)));
    }

    #[test]
    fn plan_is_deterministic() {
        assert_eq!(
            RandomPlan::generate(25, 9).positions,
            RandomPlan::generate(25, 9).positions
        );
    }

    #[test]
    fn zero_count_is_empty() {
        let plan = RandomPlan::generate(0, 42);
        assert!(plan.is_empty());
        assert_eq!(plan.iter().count(), 0);
    }
}
