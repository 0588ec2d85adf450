//! Condition compilation into the renderer expression language.
//!
//! Output is plain string formatting. Feature-attribute references are
//! emitted as `${name}` placeholders and never evaluated here.

use mapstyle_model::{Condition, Operand};
use serde_json::Value;

/// Placeholder reading `name` from the rendered feature.
#[must_use]
pub fn attribute_ref(name: &str) -> String {
    format!("${{{name}}}")
}

fn is_placeholder(text: &str) -> bool {
    text.starts_with("${") && text.ends_with('}')
}

/// Render one side of a comparison.
#[must_use]
pub fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Field { field } => attribute_ref(field),
        Operand::Literal(Value::String(text)) if is_placeholder(text) => text.clone(),
        Operand::Literal(value) => value.to_string(),
    }
}

/// Compile `condition` to `"(operand operator value)"`.
#[must_use]
pub fn compile_condition(condition: &Condition) -> String {
    format!(
        "({} {} {})",
        format_operand(&condition.operand),
        condition.operator.as_str(),
        format_operand(&condition.value)
    )
}

/// Inclusive range test `(value >= lo && value <= hi)`.
#[must_use]
pub fn compile_range(value_expr: &str, lo: f64, hi: f64) -> String {
    format!("({value_expr} >= {lo} && {value_expr} <= {hi})")
}

/// Numeric read of `name` substituting `default` when the attribute is
/// absent, empty, or not a number.
#[must_use]
pub fn numeric_attribute(name: &str, default: f64) -> String {
    let attr = attribute_ref(name);
    format!(
        "((isNaN(Number({attr})) || {attr} === \"\" || {attr} === undefined) ? {default} : Number({attr}))"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstyle_model::Operator;

    #[test]
    fn compiles_field_against_string_literal() {
        let condition = Condition::new(
            "purpose",
            Operand::field("用途"),
            Operator::Equal,
            Operand::literal("商業施設"),
        );
        assert_eq!(compile_condition(&condition), "(${用途} === \"商業施設\")");
    }

    #[test]
    fn passes_placeholders_through_verbatim() {
        let condition = Condition::new(
            "floors",
            Operand::literal("${地上階数}"),
            Operator::GreaterOrEqual,
            Operand::literal(10),
        );
        assert_eq!(compile_condition(&condition), "(${地上階数} >= 10)");
    }

    #[test]
    fn unknown_combinations_are_not_validated() {
        let condition = Condition::new(
            "odd",
            Operand::literal(true),
            Operator::Less,
            Operand::literal(serde_json::Value::Null),
        );
        assert_eq!(compile_condition(&condition), "(true < null)");
    }

    #[test]
    fn range_and_numeric_default_forms() {
        assert_eq!(compile_range("v", 0.5, 3.0), "(v >= 0.5 && v <= 3)");
        insta::assert_snapshot!(
            numeric_attribute("rank", 1.0),
            @r#"((isNaN(Number(${rank})) || ${rank} === "" || ${rank} === undefined) ? 1 : Number(${rank}))"#
        );
    }
}
