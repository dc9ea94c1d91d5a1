//! Quantitative robustness of a formula over a single valuation.
//!
//! Disjunction and negation follow the usual max / negate rules. Conjunction
//! blends both sides so that improving the still-satisfied operand of a
//! violated conjunction is still visible to the search.

use crate::schema::{Formula, Valuation};

/// Share of the weaker operand in a conjunction.
pub const CONJUNCTION_WEIGHT: f32 = 0.75;

/// Robustness returned for formula shapes that have no single-step meaning.
pub const UNSUPPORTED_ROBUSTNESS: f32 = -1.0;

/// Robustness of `formula` at one time step, in [-1, 1] for valuations in [-1, 1].
pub fn robustness(formula: &Formula, valuation: &Valuation) -> f32 {
    match formula {
        Formula::Const(value) => {
            if *value {
                1.0
            } else {
                -1.0
            }
        }
        Formula::Literal { atom, negated } => {
            let value = valuation.robustness(*atom);
            if *negated { -value } else { value }
        }
        Formula::Not(inner) => -robustness(inner, valuation),
        Formula::Or(a, b) => robustness(a, valuation).max(robustness(b, valuation)),
        Formula::And(a, b) => conjunction(robustness(a, valuation), robustness(b, valuation)),
        Formula::Next(_)
        | Formula::Finally(_)
        | Formula::Globally(_)
        | Formula::Until(..)
        | Formula::Release(..) => UNSUPPORTED_ROBUSTNESS,
    }
}

/// Weighted conjunction of two robustness values.
///
/// When exactly one side is violated the result stays in (-1, 0).
pub fn conjunction(a: f32, b: f32) -> f32 {
    let lo = a.min(b);
    let hi = a.max(b);
    let w = CONJUNCTION_WEIGHT;
    if lo * hi >= 0.0 {
        w * lo + (1.0 - w) * hi
    } else {
        -1.0 + w * (1.0 + lo) + (1.0 - w) * hi
    }
}
