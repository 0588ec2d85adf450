//! Terminal rendering of patches, module lists and condition tables.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use mapstyle_compose::Activation;
use mapstyle_model::{ConditionTable, Patch, StyleModule};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn dim_cell(text: &str) -> Cell {
    Cell::new(text).fg(Color::DarkGrey)
}

/// Patch as pretty JSON, `null` when there is nothing to send.
pub fn patch_json(patch: Option<&Patch>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&patch)
}

/// One row per flattened module with its activation state.
pub fn module_table(flattened: &[StyleModule], activation: &Activation) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Id"),
        header_cell("Type"),
        header_cell("Group"),
        header_cell("Updated"),
        header_cell("State"),
    ]);
    apply_table_style(&mut table);
    if let Some(column) = table.column_mut(0) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    for (index, module) in flattened.iter().enumerate() {
        let state = if activation.is_active(&module.id) {
            Cell::new("active").fg(Color::Green)
        } else {
            Cell::new("inactive").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&module.id),
            Cell::new(module.module_type()),
            module.group.as_deref().map_or_else(|| dim_cell("-"), Cell::new),
            module
                .updated_at
                .map_or_else(|| dim_cell("-"), |at| Cell::new(at.to_rfc3339())),
            state,
        ]);
    }
    table
}

/// Condition table rows in evaluation order.
pub fn condition_table(conditions: &ConditionTable) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Expression"), header_cell("Result")]);
    apply_table_style(&mut table);
    for (expression, result) in conditions.entries() {
        table.add_row(vec![Cell::new(expression), Cell::new(result)]);
    }
    table
}
