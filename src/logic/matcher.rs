use super::range::{self, RangeExpr};
use crate::models::{ConditionKind, DecisionRule};

/// Width of an optimal band whose upper bound is missing.
pub const OPTIMAL_SLACK: f64 = 10.0;

/// Does `value` satisfy `rule`?
///
/// `low` and `high` compare strictly, `optimal` is inclusive at both ends, so
/// a value sitting exactly on a band's lower bound is optimal and not low.
/// A rule with a blank range never matches.
pub fn matches(rule: &DecisionRule, value: f64) -> bool {
    if rule.range_min.trim().is_empty() {
        return false;
    }

    let expr = range::parse(&rule.range_min, &rule.units);
    match rule.condition {
        ConditionKind::Low => is_low(expr, value),
        ConditionKind::Optimal => is_optimal(expr, value),
        ConditionKind::High => is_high(expr, value),
    }
}

/// Below the band's lower bound or under a `<` threshold. The upper bound of
/// a band plays no part.
pub fn is_low(expr: RangeExpr, value: f64) -> bool {
    match expr {
        RangeExpr::Band { min, .. } => value < min,
        RangeExpr::LessThan(threshold) => value < threshold,
        _ => false,
    }
}

/// Inside a band, inclusive at both ends. A band with a blank upper bound
/// spans `[min, min + OPTIMAL_SLACK]`.
///
/// A bare number `"a"` is also read as `[a, a + OPTIMAL_SLACK]`. Elsewhere an
/// unrecognised shape never matches; this case is the one exception, so a
/// single-figure optimum authored without a dash still triggers.
pub fn is_optimal(expr: RangeExpr, value: f64) -> bool {
    match expr {
        RangeExpr::Band { min, max, .. } => {
            let max = max.unwrap_or(min + OPTIMAL_SLACK);
            value >= min && value <= max
        }
        RangeExpr::Single(min) => value >= min && value <= min + OPTIMAL_SLACK,
        _ => false,
    }
}

/// Above a `>`/`+` threshold, or above the last segment of a band.
pub fn is_high(expr: RangeExpr, value: f64) -> bool {
    match expr {
        RangeExpr::GreaterThan(threshold) | RangeExpr::Plus(threshold) => value > threshold,
        // Last segment rather than max: "10-20-30" is high above 30.
        RangeExpr::Band { last, .. } => value > last,
        _ => false,
    }
}
