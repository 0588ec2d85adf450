//! Numeric-range attribute → color lookups.

use mapstyle_model::ConditionTable;

use crate::color::Rgba;
use crate::condition::{compile_range, numeric_attribute};

/// Substitution used when the numeric attribute is absent, empty, or NaN.
pub const DEFAULT_MISSING_VALUE: f64 = 1.0;

/// Inclusive `[lo, hi]` band and its color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeColor<'a> {
    pub lo: f64,
    pub hi: f64,
    pub color: &'a str,
}

const fn band(lo: f64, hi: f64, color: &'static str) -> RangeColor<'static> {
    RangeColor { lo, hi, color }
}

pub const HEIGHT_ATTRIBUTE: &str = "計測高さ";

/// Measured height bands in meters.
pub const HEIGHT_BANDS: &[RangeColor<'static>] = &[
    band(0.0, 12.0, "#f1f5fb"),
    band(12.0, 31.0, "#b3d1ef"),
    band(31.0, 60.0, "#6ba4dd"),
    band(60.0, 120.0, "#2f74c4"),
    band(120.0, 180.0, "#17479a"),
    band(180.0, 10_000.0, "#0b2468"),
];

/// Flood depth ranks, 1 (under 0.5m) through 6 (20m and above).
pub const FLOOD_RANK: &[RangeColor<'static>] = &[
    band(1.0, 1.0, "#f7f5a9"),
    band(2.0, 2.0, "#ffd8c0"),
    band(3.0, 3.0, "#ffb7b7"),
    band(4.0, 4.0, "#ff9191"),
    band(5.0, 5.0, "#f285c9"),
    band(6.0, 6.0, "#dc7adc"),
];

/// Build a range table over `attribute`.
///
/// Bands are emitted most extreme first (descending lower bound) because the
/// renderer takes the first matching row. `missing_value` replaces absent or
/// non-numeric attributes, [`DEFAULT_MISSING_VALUE`] when `None`.
#[must_use]
pub fn numeric_range_table(
    attribute: &str,
    ranges: &[RangeColor<'_>],
    missing_value: Option<f64>,
    default_color: &str,
) -> ConditionTable {
    let value = numeric_attribute(attribute, missing_value.unwrap_or(DEFAULT_MISSING_VALUE));
    let mut ordered: Vec<&RangeColor<'_>> = ranges.iter().collect();
    ordered.sort_by(|a, b| b.lo.total_cmp(&a.lo));

    let mut table = ConditionTable::new(Rgba::parse_or_default(default_color).to_expression());
    for range in ordered {
        table.push(
            compile_range(&value, range.lo, range.hi),
            Rgba::parse_or_default(range.color).to_expression(),
        );
    }
    table
}
