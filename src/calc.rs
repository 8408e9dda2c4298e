use serde::Serialize;

use crate::model::{GradeColumn, GradeEntry};

/// Two-decimal rounding used for averages: `round(100 * x) / 100`.
///
/// `f64::round` rounds half away from zero; grades are always positive so this
/// matches round-half-up.
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Weighted mean of `value * weight` over entries whose column still exists.
///
/// `None` when there are no entries, or when the weights of all resolvable
/// columns sum to zero.
pub fn weighted_average<'a, I, F>(entries: I, column_of: F) -> Option<f64>
where
    I: IntoIterator<Item = &'a GradeEntry>,
    F: Fn(&str) -> Option<&'a GradeColumn>,
{
    let mut seen_any = false;
    let mut sum: f64 = 0.0;
    let mut weight_sum: f64 = 0.0;

    for entry in entries {
        seen_any = true;
        // Dangling column: contributes to neither accumulator.
        let Some(column) = column_of(&entry.column_id) else {
            continue;
        };
        let w = column.weight;
        sum += entry.value * w;
        weight_sum += w;
    }

    if !seen_any || weight_sum == 0.0 {
        return None;
    }
    Some(round_off_2_decimals(sum / weight_sum))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeBand {
    Good,
    Medium,
    Poor,
}

impl GradeBand {
    pub fn of(value: f64) -> Self {
        if value <= 2.0 {
            GradeBand::Good
        } else if value <= 4.0 {
            GradeBand::Medium
        } else {
            GradeBand::Poor
        }
    }
}
