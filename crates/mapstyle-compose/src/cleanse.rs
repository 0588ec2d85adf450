//! Cleanse fragments undoing a module's effect.
//!
//! Cleanse fragments write `null` to every property a module type may set,
//! which the renderer reads as "restore the default".

use mapstyle_model::{Facet, ModuleType, Patch, StyleModule, TemplateLibrary};
use serde_json::Value;

use crate::flatten::flatten;
use crate::merge::{MergeModule, MergePass, merge_overrides};

const COLOR_FACETS: [Facet; 4] = [Facet::Marker, Facet::Polyline, Facet::Polygon, Facet::Tiles3d];

fn nulls(props: &[(Facet, &str)]) -> Patch {
    let mut patch = Patch::new();
    for (facet, property) in props {
        patch.set(*facet, property, Value::Null);
    }
    patch
}

/// Static cleanse fragment for a module type.
#[must_use]
pub fn cleanse_for_type(module_type: ModuleType) -> Option<Patch> {
    let patch = match module_type {
        ModuleType::Template | ModuleType::SwitchGroup | ModuleType::SwitchDataset => return None,
        ModuleType::SwitchVisibility => {
            let props: Vec<(Facet, &str)> = COLOR_FACETS.iter().map(|facet| (*facet, "show")).collect();
            nulls(&props)
        }
        ModuleType::PointColor => nulls(&[(Facet::Marker, "pointColor")]),
        ModuleType::PolylineColor => nulls(&[(Facet::Polyline, "strokeColor")]),
        ModuleType::PolygonColor => nulls(&[(Facet::Polygon, "fillColor")]),
        ModuleType::BuildingColor | ModuleType::BuildingTransparency => {
            nulls(&[(Facet::Tiles3d, "color")])
        }
        ModuleType::BuildingFilter => nulls(&[(Facet::Tiles3d, "show")]),
        ModuleType::BuildingShadow => nulls(&[(Facet::Tiles3d, "shadows")]),
        ModuleType::ColorGradient => {
            let props: Vec<(Facet, &str)> = COLOR_FACETS
                .iter()
                .map(|facet| (*facet, facet.color_property()))
                .collect();
            nulls(&props)
        }
    };
    Some(patch)
}

/// Cleanse fragment contributed by `module` in a cleanse pass.
///
/// Dataset switches contribute their stored `cleanseOverride`. Every other
/// type contributes its static fragment; a stored `cleanseOverride` on those
/// types is ignored.
#[must_use]
pub fn cleanse_fragment(module: &StyleModule) -> Option<Patch> {
    let module_type = module.module_type();
    if module_type == ModuleType::SwitchDataset {
        return module
            .cleanse_override
            .clone()
            .or_else(|| cleanse_for_type(module_type));
    }
    cleanse_for_type(module_type)
}

/// Fragment to carry into the next pass after `module` is removed.
///
/// Template modules cleanse their expanded components too.
#[must_use]
pub fn removal_cleanse(module: &StyleModule, templates: &TemplateLibrary) -> Option<Patch> {
    let expanded = flatten(std::slice::from_ref(module), templates);
    let entries: Vec<MergeModule<'_>> = expanded.iter().map(MergeModule::inactive).collect();
    merge_overrides(MergePass::Cleanse, &entries, None, None)
}
