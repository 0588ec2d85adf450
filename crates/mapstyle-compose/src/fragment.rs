//! Per-type fragment generation.
//!
//! Each module type has one handler in [`HANDLERS`]. Precedence between a
//! module's explicit `override` and its generated fragment differs by type:
//!
//! | type                               | fragment |
//! |------------------------------------|----------|
//! | `template`                         | `userSettings.override`, else `override` |
//! | `switchGroup`, `switchDataset`     | `override` (dataset switches fall back in the merge) |
//! | `switchVisibility`, color rules    | `override`, else generated |
//! | `buildingColor`, `buildingFilter`  | `override`, else generated |
//! | `buildingShadow`                   | `override`, else generated |
//! | `buildingTransparency`             | generated from `override` color, else the pass color |
//! | `colorGradient`                    | generated merged over `override` |

use mapstyle_model::{
    BuildingColorSettings, BuildingColorType, BuildingFilterSettings, ColorGradientSettings,
    ColorRuleSettings, ConditionTable, Facet, ModuleSettings, ModuleType, Patch, StyleModule,
    SwitchVisibilitySettings, expression_leaf,
};
use serde_json::Value;

use crate::color::{DEFAULT_COLOR, Rgba, apply_transparency};
use crate::condition::{compile_condition, numeric_attribute};
use crate::context::FragmentContext;
use crate::merge::merged;
use crate::tables::{
    BUILDING_PURPOSE, BUILDING_PURPOSE_ATTRIBUTE, BUILDING_STRUCTURE,
    BUILDING_STRUCTURE_ATTRIBUTE, DEFAULT_MISSING_VALUE, FLOOD_RANK, HEIGHT_ATTRIBUTE,
    HEIGHT_BANDS, categorical_table, combine_filters, compile_range_filter, filter_table,
    gradient_color_table, gradient_domain, numeric_range_table,
};

/// Produces the fragment an active module contributes.
pub type FragmentHandler = fn(&StyleModule, &FragmentContext) -> Option<Patch>;

/// Handler lookup, one entry per module type.
pub const HANDLERS: [(ModuleType, FragmentHandler); 12] = [
    (ModuleType::Template, template_fragment),
    (ModuleType::SwitchGroup, explicit_override),
    (ModuleType::SwitchDataset, explicit_override),
    (ModuleType::SwitchVisibility, visibility_fragment),
    (ModuleType::PointColor, color_rule_fragment),
    (ModuleType::PolylineColor, color_rule_fragment),
    (ModuleType::PolygonColor, color_rule_fragment),
    (ModuleType::BuildingColor, building_color_fragment),
    (ModuleType::BuildingFilter, building_filter_fragment),
    (ModuleType::BuildingTransparency, transparency_fragment),
    (ModuleType::BuildingShadow, shadow_fragment),
    (ModuleType::ColorGradient, gradient_fragment),
];

#[must_use]
pub fn handler_for(module_type: ModuleType) -> FragmentHandler {
    HANDLERS
        .iter()
        .find(|(candidate, _)| *candidate == module_type)
        .map_or(explicit_override as FragmentHandler, |(_, handler)| *handler)
}

/// Resolve the fragment `module` contributes to an update pass.
#[must_use]
pub fn fragment_for(module: &StyleModule, ctx: &FragmentContext) -> Option<Patch> {
    handler_for(module.module_type())(module, ctx)
}

/// Base color expression for buildings.
#[must_use]
pub fn default_color_expression() -> String {
    DEFAULT_COLOR.to_expression()
}

fn explicit_override(module: &StyleModule, _ctx: &FragmentContext) -> Option<Patch> {
    module.override_patch.clone()
}

fn override_or(module: &StyleModule, generate: impl FnOnce() -> Option<Patch>) -> Option<Patch> {
    module.override_patch.clone().or_else(generate)
}

fn template_fragment(module: &StyleModule, _ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::Template(settings) = &module.settings else {
        return None;
    };
    settings
        .user_settings
        .override_patch
        .clone()
        .or_else(|| module.override_patch.clone())
}

fn visibility_fragment(module: &StyleModule, _ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::SwitchVisibility(settings) = &module.settings else {
        return None;
    };
    override_or(module, || visibility_patch(settings))
}

fn visibility_patch(settings: &SwitchVisibilitySettings) -> Option<Patch> {
    if settings.items.is_empty() {
        return None;
    }
    let mut table = ConditionTable::new("false");
    for item in &settings.items {
        if settings.selected.iter().any(|id| *id == item.id) {
            table.push(compile_condition(&item.condition), "true");
        }
    }
    Some(Patch::leaf(settings.facet, "show", expression_leaf(&table)))
}

fn color_rule_fragment(module: &StyleModule, _ctx: &FragmentContext) -> Option<Patch> {
    let (facet, settings) = match &module.settings {
        ModuleSettings::PointColor(settings) => (Facet::Marker, settings),
        ModuleSettings::PolylineColor(settings) => (Facet::Polyline, settings),
        ModuleSettings::PolygonColor(settings) => (Facet::Polygon, settings),
        _ => return None,
    };
    override_or(module, || color_rule_patch(facet, settings))
}

fn color_rule_patch(facet: Facet, settings: &ColorRuleSettings) -> Option<Patch> {
    if settings.rules.is_empty() && settings.default_color.is_none() {
        return None;
    }
    let default = settings
        .default_color
        .as_deref()
        .map_or(DEFAULT_COLOR, Rgba::parse_or_default);
    let table = ConditionTable::with_rows(
        settings.rules.iter().map(|rule| {
            (
                compile_condition(&rule.condition),
                Rgba::parse_or_default(&rule.color).to_expression(),
            )
        }),
        default.to_expression(),
    );
    Some(Patch::leaf(facet, facet.color_property(), expression_leaf(&table)))
}

fn building_color_fragment(module: &StyleModule, _ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::BuildingColor(settings) = &module.settings else {
        return None;
    };
    override_or(module, || building_color_patch(settings))
}

fn building_color_patch(settings: &BuildingColorSettings) -> Option<Patch> {
    let default = "#ffffff";
    let table = match settings.color_type {
        BuildingColorType::None => {
            return Some(Patch::leaf(
                Facet::Tiles3d,
                "color",
                Value::String(default_color_expression()),
            ));
        }
        BuildingColorType::Height => {
            numeric_range_table(HEIGHT_ATTRIBUTE, HEIGHT_BANDS, Some(0.0), default)
        }
        BuildingColorType::Purpose => {
            categorical_table(BUILDING_PURPOSE_ATTRIBUTE, BUILDING_PURPOSE, default)
        }
        BuildingColorType::Structure => {
            categorical_table(BUILDING_STRUCTURE_ATTRIBUTE, BUILDING_STRUCTURE, default)
        }
        BuildingColorType::FloodRank => {
            let Some(attribute) = settings.attribute.as_deref() else {
                tracing::debug!("Flood rank coloring without an attribute, skipped");
                return None;
            };
            numeric_range_table(attribute, FLOOD_RANK, None, default)
        }
    };
    Some(Patch::leaf(Facet::Tiles3d, "color", expression_leaf(&table)))
}

fn building_filter_fragment(module: &StyleModule, ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::BuildingFilter(settings) = &module.settings else {
        return None;
    };
    override_or(module, || building_filter_patch(settings, ctx))
}

fn building_filter_patch(settings: &BuildingFilterSettings, ctx: &FragmentContext) -> Option<Patch> {
    if settings.filters.is_empty() {
        return None;
    }
    let mut terms = Vec::with_capacity(settings.filters.len());
    for filter in &settings.filters {
        let domain = ctx.attribute(&filter.attribute);
        let min = filter.min.or_else(|| domain.and_then(|d| d.min));
        let max = filter.max.or_else(|| domain.and_then(|d| d.max));
        let (Some(min), Some(max)) = (min, max) else {
            tracing::debug!(attribute = %filter.attribute, "Filter bounds unknown, skipped");
            continue;
        };
        let value = numeric_attribute(&filter.attribute, DEFAULT_MISSING_VALUE);
        terms.push(compile_range_filter(&value, filter.value, min, max));
    }
    let expression = combine_filters(&terms);
    Some(Patch::leaf(Facet::Tiles3d, "show", expression_leaf(&filter_table(&expression))))
}

fn transparency_fragment(module: &StyleModule, ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::BuildingTransparency(settings) = &module.settings else {
        return None;
    };
    let base = module
        .override_patch
        .as_ref()
        .and_then(|patch| patch.get(Facet::Tiles3d, "color"))
        .or_else(|| {
            ctx.existing_override
                .as_ref()
                .and_then(|patch| patch.get(Facet::Tiles3d, "color"))
        })
        .cloned()
        .unwrap_or_else(|| Value::String(default_color_expression()));
    Some(Patch::leaf(
        Facet::Tiles3d,
        "color",
        apply_transparency(&base, settings.transparency),
    ))
}

fn shadow_fragment(module: &StyleModule, _ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::BuildingShadow(settings) = &module.settings else {
        return None;
    };
    override_or(module, || {
        Some(Patch::leaf(
            Facet::Tiles3d,
            "shadows",
            Value::String(settings.shadow.as_str().to_string()),
        ))
    })
}

fn gradient_fragment(module: &StyleModule, ctx: &FragmentContext) -> Option<Patch> {
    let ModuleSettings::ColorGradient(settings) = &module.settings else {
        return None;
    };
    let generated = gradient_patch(settings, ctx);
    match (module.override_patch.clone(), generated) {
        (Some(base), Some(generated)) => Some(merged(base, &generated)),
        (base, generated) => generated.or(base),
    }
}

fn gradient_patch(settings: &ColorGradientSettings, ctx: &FragmentContext) -> Option<Patch> {
    let domain_info = ctx.attribute(&settings.attribute);
    let min = settings.min.or_else(|| domain_info.and_then(|d| d.min));
    let max = settings.max.or_else(|| domain_info.and_then(|d| d.max));
    let domain = gradient_domain(min, max, settings.step);
    if domain.is_empty() {
        tracing::debug!(attribute = %settings.attribute, "Gradient domain empty, skipped");
        return None;
    }
    let table = gradient_color_table(
        &settings.attribute,
        &settings.start_color,
        &settings.end_color,
        &domain,
        "#ffffff",
    );
    Some(Patch::leaf(
        settings.facet,
        settings.facet.color_property(),
        expression_leaf(&table),
    ))
}
