//! Categorical attribute → color lookups.

use mapstyle_model::{Condition, ConditionTable, Operand, Operator};

use crate::color::Rgba;
use crate::condition::compile_condition;

/// One categorical value and its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryColor {
    pub value: &'static str,
    pub color: &'static str,
}

const fn entry(value: &'static str, color: &'static str) -> CategoryColor {
    CategoryColor { value, color }
}

pub const BUILDING_PURPOSE_ATTRIBUTE: &str = "用途";

/// Building usage classes.
pub const BUILDING_PURPOSE: &[CategoryColor] = &[
    entry("業務施設", "#ff7f7f"),
    entry("商業施設", "#ff0000"),
    entry("宿泊施設", "#ff7f00"),
    entry("商業系複合施設", "#ff007f"),
    entry("住宅", "#ffff00"),
    entry("共同住宅", "#ffff7f"),
    entry("店舗等併用住宅", "#ffbf00"),
    entry("店舗等併用共同住宅", "#ffbf7f"),
    entry("作業所併用住宅", "#bfbf00"),
    entry("官公庁施設", "#7f7fff"),
    entry("文教厚生施設", "#00bfff"),
    entry("運輸倉庫施設", "#7f00ff"),
    entry("工場", "#00ffbf"),
    entry("農林漁業用施設", "#00ff00"),
    entry("供給処理施設", "#7f3f00"),
    entry("防衛施設", "#3f3f7f"),
    entry("その他", "#bfbfbf"),
    entry("不明", "#7f7f7f"),
];

pub const BUILDING_STRUCTURE_ATTRIBUTE: &str = "構造種別";

/// Building structure classes.
pub const BUILDING_STRUCTURE: &[CategoryColor] = &[
    entry("木造・土蔵造", "#e0a060"),
    entry("鉄骨鉄筋コンクリート造", "#a02060"),
    entry("鉄筋コンクリート造", "#e06090"),
    entry("鉄骨造", "#6080e0"),
    entry("軽量鉄骨造", "#90c0f0"),
    entry("レンガ造・コンクリートブロック造・石造", "#c08040"),
    entry("非木造", "#a0a0a0"),
    entry("不明", "#7f7f7f"),
];

/// One `attribute === value` row per entry, in declaration order.
#[must_use]
pub fn categorical_table(
    attribute: &str,
    entries: &[CategoryColor],
    default_color: &str,
) -> ConditionTable {
    let mut table = ConditionTable::new(Rgba::parse_or_default(default_color).to_expression());
    for (index, category) in entries.iter().enumerate() {
        let condition = Condition::new(
            format!("{attribute}-{index}"),
            Operand::field(attribute),
            Operator::Equal,
            Operand::literal(category.value),
        );
        table.push(
            compile_condition(&condition),
            Rgba::parse_or_default(category.color).to_expression(),
        );
    }
    table
}
