//! Scoring rules.
//!
//! Each rule looks at one aspect of the outline and returns a delta for its
//! dimension plus a rationale. Rules are independent; the scorer sums the
//! deltas per dimension on top of the dimension's base and clamps.

use super::outline::SourceOutline;
use super::Dimension;
use crate::quality::lexer::Token;

/// Required hook names.
pub const REQUIRED_HOOKS: [&str; 2] = ["initialize", "handle_data"];

/// Literal values that never count as magic numbers.
pub const ALLOWED_LITERALS: [f64; 5] = [0.0, 1.0, -1.0, 2.0, 100.0];

/// One independent scoring rule.
pub trait QualityRule: Send + Sync {
    /// Stable identifier, used in findings.
    fn id(&self) -> &'static str;

    fn dimension(&self) -> Dimension;

    /// Delta for this rule's dimension and the reason for it.
    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String);
}

/// The fixed, ordered rule list.
pub fn default_rules() -> Vec<Box<dyn QualityRule>> {
    vec![
        // Structure
        Box::new(HookDefined(REQUIRED_HOOKS[0])),
        Box::new(HookDefined(REQUIRED_HOOKS[1])),
        Box::new(CustomIndicatorDefined),
        Box::new(UnitRegistered),
        // Error handling
        Box::new(TryBlocks),
        Box::new(UnitChecks),
        // Documentation
        Box::new(UnitDocumented),
        Box::new(DocumentedFunctions),
        // Complexity
        Box::new(BranchComplexity),
        // Best practices
        Box::new(MagicNumbers),
        Box::new(SnakeCaseNames),
        Box::new(ReturnsPresent),
        Box::new(GuardedReturns),
    ]
}

// ─── Structure ───────────────────────────────────────────────────────

/// +15 when the named hook is defined.
pub struct HookDefined(pub &'static str);

impl QualityRule for HookDefined {
    fn id(&self) -> &'static str {
        match self.0 {
            "initialize" => "hook_initialize",
            "handle_data" => "hook_handle_data",
            _ => "hook",
        }
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        if outline.defines(self.0) {
            (15.0, format!("defines {}()", self.0))
        } else {
            (0.0, format!("{}() is not defined", self.0))
        }
    }
}

pub struct CustomIndicatorDefined;

impl QualityRule for CustomIndicatorDefined {
    fn id(&self) -> &'static str {
        "custom_indicator"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        if outline.defines("custom_indicator") {
            (10.0, "defines custom_indicator()".into())
        } else {
            (0.0, "no custom_indicator()".into())
        }
    }
}

pub struct UnitRegistered;

impl QualityRule for UnitRegistered {
    fn id(&self) -> &'static str {
        "unit_registered"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Structure
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        if outline.registrations > 0 {
            (10.0, "registers a unit".into())
        } else {
            (0.0, "no strategy(...) registration".into())
        }
    }
}

// ─── Error handling ──────────────────────────────────────────────────

/// +15 per `try` block, capped at 40.
pub struct TryBlocks;

impl QualityRule for TryBlocks {
    fn id(&self) -> &'static str {
        "try_blocks"
    }

    fn dimension(&self) -> Dimension {
        Dimension::ErrorHandling
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let n = outline.count(|t| *t == Token::Try);
        ((n as f64 * 15.0).min(40.0), format!("{n} try block(s)"))
    }
}

/// +3 per comparison against `()`, capped at 30.
pub struct UnitChecks;

impl QualityRule for UnitChecks {
    fn id(&self) -> &'static str {
        "absent_value_checks"
    }

    fn dimension(&self) -> Dimension {
        Dimension::ErrorHandling
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let n = outline.unit_comparisons();
        ((n as f64 * 3.0).min(30.0), format!("{n} check(s) against ()"))
    }
}

// ─── Documentation ───────────────────────────────────────────────────

pub struct UnitDocumented;

impl QualityRule for UnitDocumented {
    fn id(&self) -> &'static str {
        "unit_doc"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Documentation
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        if outline.unit_documented {
            (30.0, "unit carries doc text".into())
        } else {
            (0.0, "unit has no doc text".into())
        }
    }
}

/// +10 per documented function, capped at 70.
pub struct DocumentedFunctions;

impl QualityRule for DocumentedFunctions {
    fn id(&self) -> &'static str {
        "fn_docs"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Documentation
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let n = outline.functions.iter().filter(|f| f.documented).count();
        (
            (n as f64 * 10.0).min(70.0),
            format!("{n} of {} function(s) documented", outline.functions.len()),
        )
    }
}

// ─── Complexity ──────────────────────────────────────────────────────

/// Tiered score from branch and boolean-combinator counts.
pub struct BranchComplexity;

impl BranchComplexity {
    /// Branch keywords plus `&&`/`||`. A `do { } while` loop counts once.
    pub fn indicators(outline: &SourceOutline<'_>) -> usize {
        let tokens = outline.tokens();
        // One entry per open brace: does it open a `do` body?
        let mut braces: Vec<bool> = Vec::new();
        let mut closed_do_body = false;
        let mut count = 0;
        for (i, token) in tokens.iter().enumerate() {
            let do_tail = std::mem::take(&mut closed_do_body);
            match token {
                Token::LBrace | Token::MapOpen => {
                    let prev = i.checked_sub(1).map(|p| tokens[p]);
                    braces.push(prev == Some(Token::Do));
                }
                Token::RBrace => closed_do_body = braces.pop().unwrap_or(false),
                Token::While if do_tail => {}
                Token::If
                | Token::While
                | Token::For
                | Token::Loop
                | Token::Do
                | Token::Switch
                | Token::Try
                | Token::AndAnd
                | Token::OrOr => count += 1,
                _ => {}
            }
        }
        count
    }

    pub fn tier(indicators: usize) -> f64 {
        match indicators {
            0..=5 => 100.0,
            6..=10 => 80.0,
            11..=15 => 60.0,
            16..=20 => 40.0,
            _ => 20.0,
        }
    }
}

impl QualityRule for BranchComplexity {
    fn id(&self) -> &'static str {
        "complexity_tier"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Complexity
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let n = Self::indicators(outline);
        (Self::tier(n), format!("{n} branch/combinator indicator(s)"))
    }
}

// ─── Best practices ──────────────────────────────────────────────────

/// −2 per numeric literal outside the allowed set, capped at −20.
pub struct MagicNumbers;

impl MagicNumbers {
    pub fn count(outline: &SourceOutline<'_>) -> usize {
        outline
            .numeric_literals()
            .into_iter()
            .filter(|v| !ALLOWED_LITERALS.contains(v))
            .count()
    }
}

impl QualityRule for MagicNumbers {
    fn id(&self) -> &'static str {
        "magic_numbers"
    }

    fn dimension(&self) -> Dimension {
        Dimension::BestPractices
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let n = Self::count(outline);
        (0.0 - (n as f64 * 2.0).min(20.0), format!("{n} magic number(s)"))
    }
}

/// +10 when snake_case identifiers are used.
pub struct SnakeCaseNames;

impl QualityRule for SnakeCaseNames {
    fn id(&self) -> &'static str {
        "snake_case"
    }

    fn dimension(&self) -> Dimension {
        Dimension::BestPractices
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let snake = outline
            .identifiers()
            .any(|name| name.contains('_') && !name.chars().any(|c| c.is_ascii_uppercase()));
        if snake {
            (10.0, "uses snake_case names".into())
        } else {
            (0.0, "no snake_case names".into())
        }
    }
}

pub struct ReturnsPresent;

impl QualityRule for ReturnsPresent {
    fn id(&self) -> &'static str {
        "returns"
    }

    fn dimension(&self) -> Dimension {
        Dimension::BestPractices
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        if outline.return_depths.is_empty() {
            (0.0, "no return statements".into())
        } else {
            (10.0, format!("{} return statement(s)", outline.return_depths.len()))
        }
    }
}

/// +5 per return inside an `if`/`else` body, capped at 20.
pub struct GuardedReturns;

impl QualityRule for GuardedReturns {
    fn id(&self) -> &'static str {
        "guarded_returns"
    }

    fn dimension(&self) -> Dimension {
        Dimension::BestPractices
    }

    fn evaluate(&self, outline: &SourceOutline<'_>) -> (f64, String) {
        let n = outline.return_depths.iter().filter(|&&d| d > 0).count();
        ((n as f64 * 5.0).min(20.0), format!("{n} early return(s)"))
    }
}
