//! Numeric range filters compiled to boolean expressions.

use mapstyle_model::ConditionTable;

/// Compile a `[from, to]` window over a `[min, max]` domain.
///
/// Bounds equal to the domain edge are elided: the full domain is the
/// literal `true`, an open upper end is `value >= from`, an open lower end is
/// `value <= to`.
#[must_use]
pub fn compile_range_filter(value_expr: &str, value: [f64; 2], min: f64, max: f64) -> String {
    let [from, to] = value;
    match (from == min, to == max) {
        (true, true) => "true".to_string(),
        (false, true) => format!("{value_expr} >= {from}"),
        (true, false) => format!("{value_expr} <= {to}"),
        (false, false) => format!("{value_expr} >= {from} && {value_expr} <= {to}"),
    }
}

/// Conjunction of compiled filters, dropping literal `true` terms.
#[must_use]
pub fn combine_filters<I, S>(filters: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let terms: Vec<String> = filters
        .into_iter()
        .filter(|f| f.as_ref() != "true")
        .map(|f| format!("({})", f.as_ref()))
        .collect();
    if terms.is_empty() {
        "true".to_string()
    } else {
        terms.join(" && ")
    }
}

/// Show/hide table for a combined filter expression.
#[must_use]
pub fn filter_table(expression: &str) -> ConditionTable {
    if expression == "true" {
        ConditionTable::new("true")
    } else {
        ConditionTable::with_rows([(expression, "true")], "false")
    }
}
