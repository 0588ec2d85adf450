//! Linear color gradients over a stepped numeric domain.

use mapstyle_model::ConditionTable;

use crate::color::Rgba;
use crate::condition::numeric_attribute;
use crate::tables::range::DEFAULT_MISSING_VALUE;

/// Upper bound on generated domain values.
pub const MAX_GRADIENT_STEPS: usize = 1024;

fn interpolate(start: u8, end: u8, index: usize, last: usize) -> u8 {
    let start = f64::from(start);
    let delta = f64::from(end) - start;
    (start + delta * index as f64 / last as f64).round().clamp(0.0, 255.0) as u8
}

/// `count` evenly spaced colors from `start` to `end`, as `#rrggbb`.
///
/// Each channel is `round(start + (end - start) * i / (count - 1))`.
/// A count of one returns the start color alone.
#[must_use]
pub fn gradient(start: &str, end: &str, count: usize) -> Vec<String> {
    let from = Rgba::parse_or_default(start);
    let to = Rgba::parse_or_default(end);
    match count {
        0 => Vec::new(),
        1 => vec![from.to_hex()],
        _ => {
            let last = count - 1;
            (0..count)
                .map(|i| {
                    Rgba::rgb(
                        interpolate(from.r, to.r, i, last),
                        interpolate(from.g, to.g, i, last),
                        interpolate(from.b, to.b, i, last),
                    )
                    .to_hex()
                })
                .collect()
        }
    }
}

/// Values from `min` to `max` inclusive, `step` apart.
///
/// Empty when any bound is missing or non-finite, `min >= max`,
/// `step >= max`, or `step` is not positive.
#[must_use]
pub fn gradient_domain(min: Option<f64>, max: Option<f64>, step: Option<f64>) -> Vec<f64> {
    let (Some(min), Some(max), Some(step)) = (min, max, step) else {
        return Vec::new();
    };
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Vec::new();
    }
    if min >= max || step >= max || step <= 0.0 {
        return Vec::new();
    }

    let tolerance = step * 1e-9;
    let mut values = Vec::new();
    for index in 0u32.. {
        let value = min + step * f64::from(index);
        if value > max + tolerance {
            break;
        }
        if values.len() == MAX_GRADIENT_STEPS {
            tracing::warn!(
                min,
                max,
                step,
                limit = MAX_GRADIENT_STEPS,
                "Gradient domain truncated"
            );
            break;
        }
        values.push(value);
    }
    values
}

/// Threshold table pairing `domain[i]` with `colors[i]`.
///
/// Rows are emitted highest threshold first so the first `>=` match selects
/// the closest lower domain value.
#[must_use]
pub fn gradient_table(
    value_expr: &str,
    domain: &[f64],
    colors: &[String],
    default_color: &str,
) -> ConditionTable {
    let mut table = ConditionTable::new(Rgba::parse_or_default(default_color).to_expression());
    for (value, color) in domain.iter().zip(colors).rev() {
        table.push(
            format!("({value_expr} >= {value})"),
            Rgba::parse_or_default(color).to_expression(),
        );
    }
    table
}

/// Gradient table over a numeric attribute.
#[must_use]
pub fn gradient_color_table(
    attribute: &str,
    start_color: &str,
    end_color: &str,
    domain: &[f64],
    default_color: &str,
) -> ConditionTable {
    let colors = gradient(start_color, end_color, domain.len());
    let value = numeric_attribute(attribute, DEFAULT_MISSING_VALUE);
    gradient_table(&value, domain, &colors, default_color)
}
