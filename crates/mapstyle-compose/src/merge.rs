//! Ordered override merging.
//!
//! Fragments are combined with [`merge_into`]: plain objects merge key by
//! key, everything else (arrays, scalars, `null`) is replaced by the later
//! fragment.
//!
//! [`merge_overrides`] applies fragments in this order:
//!
//! 1. the carried-over cleanse fragment, if any
//! 2. timestamped modules, ascending `updatedAt`
//! 3. untimestamped modules, list order
//! 4. on update passes with a group switch present, the `3dtiles.color`
//!    produced so far re-faded with the last timestamped transparency

use mapstyle_model::{ConfigVariant, Facet, ModuleSettings, ModuleType, Patch, StyleModule};
use serde_json::{Map, Value, json};

use crate::cleanse::cleanse_fragment;
use crate::color::apply_transparency;

/// Which fragment each module contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePass {
    /// Active modules contribute their resolved fragments.
    Update,
    /// Inactive modules contribute their cleanse fragments.
    Cleanse,
}

/// A module paired with its resolved fragment.
#[derive(Debug, Clone)]
pub struct MergeModule<'a> {
    pub module: &'a StyleModule,
    pub fragment: Option<Patch>,
}

impl<'a> MergeModule<'a> {
    pub fn new(module: &'a StyleModule, fragment: Option<Patch>) -> Self {
        Self { module, fragment }
    }

    /// Entry for a cleanse pass, which never reads the fragment.
    pub fn inactive(module: &'a StyleModule) -> Self {
        Self {
            module,
            fragment: None,
        }
    }
}

/// Deep-merge `source` into `target`.
pub fn merge_into(target: &mut Patch, source: &Patch) {
    merge_maps(target.as_map_mut(), source.as_map());
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (target.get_mut(key), value) {
            merge_maps(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Deep-merge two owned patches, `later` winning conflicts.
#[must_use]
pub fn merged(mut earlier: Patch, later: &Patch) -> Patch {
    merge_into(&mut earlier, later);
    earlier
}

/// Minimal patch pointing the dataset at `variant`.
#[must_use]
pub fn switch_dataset_patch(variant: &ConfigVariant) -> Patch {
    let mut patch = Patch::leaf(Facet::Data, "url", Value::String(variant.url.clone()));
    patch.set(Facet::Data, "time", json!({ "updateClockOnLoad": true }));
    patch
}

fn contribution(
    pass: MergePass,
    entry: &MergeModule<'_>,
    selected_variant: Option<&ConfigVariant>,
) -> Option<Patch> {
    match pass {
        MergePass::Cleanse => cleanse_fragment(entry.module),
        MergePass::Update if entry.module.module_type() == ModuleType::SwitchDataset => entry
            .fragment
            .clone()
            .or_else(|| selected_variant.map(switch_dataset_patch)),
        MergePass::Update => entry.fragment.clone(),
    }
}

/// Merge one pass worth of modules into a single patch.
///
/// Returns `None` when nothing would be sent. Never fails: malformed
/// fragments pass through unchanged.
#[must_use]
pub fn merge_overrides(
    pass: MergePass,
    modules: &[MergeModule<'_>],
    carried: Option<&Patch>,
    selected_variant: Option<&ConfigVariant>,
) -> Option<Patch> {
    let mut result = carried.cloned().unwrap_or_default();

    let (mut timestamped, untimestamped): (Vec<&MergeModule<'_>>, Vec<&MergeModule<'_>>) =
        modules.iter().partition(|entry| entry.module.updated_at.is_some());
    timestamped.sort_by_key(|entry| entry.module.updated_at);

    let mut transparency = None;
    for entry in &timestamped {
        if let ModuleSettings::BuildingTransparency(settings) = &entry.module.settings {
            transparency = Some(settings.transparency);
        }
        if let Some(fragment) = contribution(pass, entry, selected_variant) {
            merge_into(&mut result, &fragment);
        }
    }
    for entry in &untimestamped {
        if let Some(fragment) = contribution(pass, entry, selected_variant) {
            merge_into(&mut result, &fragment);
        }
    }

    let has_group_switch = modules
        .iter()
        .any(|entry| entry.module.module_type() == ModuleType::SwitchGroup);
    if pass == MergePass::Update
        && has_group_switch
        && let Some(transparency) = transparency.filter(|value| *value != 100)
    {
        let current = result
            .get(Facet::Tiles3d, "color")
            .cloned()
            .unwrap_or(Value::Null);
        let refaded = Patch::leaf(Facet::Tiles3d, "color", apply_transparency(&current, transparency));
        tracing::trace!(transparency, "Re-applying transparency after group switch");
        merge_into(&mut result, &refaded);
    }

    (!result.is_empty()).then_some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mapstyle_model::{
        BuildingShadowSettings, BuildingTransparencySettings, SwitchDatasetSettings,
        SwitchGroupSettings,
    };

    fn patch(value: Value) -> Patch {
        Patch::from_value(value).expect("object")
    }

    fn shadow(id: &str) -> StyleModule {
        StyleModule::new(id, ModuleSettings::BuildingShadow(BuildingShadowSettings::default()))
    }

    #[test]
    fn objects_union_and_leaves_replace() {
        let mut target = patch(json!({"3dtiles": {"color": "a", "show": true}, "list": [1, 2]}));
        merge_into(
            &mut target,
            &patch(json!({"3dtiles": {"color": "b"}, "list": [3], "marker": {"show": false}})),
        );
        assert_eq!(
            target.into_value(),
            json!({"3dtiles": {"color": "b", "show": true}, "list": [3], "marker": {"show": false}})
        );
    }

    #[test]
    fn null_and_scalars_replace_objects() {
        let mut target = patch(json!({"3dtiles": {"color": {"expression": {"conditions": []}}}}));
        merge_into(&mut target, &patch(json!({"3dtiles": {"color": null}})));
        assert_eq!(target.get(Facet::Tiles3d, "color"), Some(&Value::Null));
        merge_into(&mut target, &patch(json!({"3dtiles": 5})));
        assert_eq!(target.into_value(), json!({"3dtiles": 5}));
    }

    #[test]
    fn empty_passes_send_nothing() {
        assert!(merge_overrides(MergePass::Update, &[], None, None).is_none());
        assert!(merge_overrides(MergePass::Cleanse, &[], None, None).is_none());
        let carried = patch(json!({"3dtiles": {"shadows": null}}));
        assert_eq!(
            merge_overrides(MergePass::Cleanse, &[], Some(&carried), None),
            Some(carried)
        );
    }

    #[test]
    fn later_timestamp_wins_regardless_of_list_order() {
        let early = shadow("a").with_updated_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let late = shadow("b").with_updated_at(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        let entries = vec![
            MergeModule::new(&late, Some(Patch::leaf(Facet::Tiles3d, "shadows", json!("late")))),
            MergeModule::new(&early, Some(Patch::leaf(Facet::Tiles3d, "shadows", json!("early")))),
        ];
        let result = merge_overrides(MergePass::Update, &entries, None, None).expect("patch");
        assert_eq!(result.get(Facet::Tiles3d, "shadows"), Some(&json!("late")));
    }

    #[test]
    fn untimestamped_modules_merge_after_timestamped() {
        let stamped = shadow("a").with_updated_at(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        let plain = shadow("b");
        let entries = vec![
            MergeModule::new(&plain, Some(Patch::leaf(Facet::Tiles3d, "shadows", json!("plain")))),
            MergeModule::new(&stamped, Some(Patch::leaf(Facet::Tiles3d, "shadows", json!("stamped")))),
        ];
        let result = merge_overrides(MergePass::Update, &entries, None, None).expect("patch");
        assert_eq!(result.get(Facet::Tiles3d, "shadows"), Some(&json!("plain")));
    }

    #[test]
    fn switch_dataset_falls_back_to_selected_variant() {
        let module = StyleModule::new("sd", ModuleSettings::SwitchDataset(SwitchDatasetSettings {}));
        let variant = ConfigVariant {
            name: "lod2".to_string(),
            url: "https://example.com/lod2/tileset.json".to_string(),
            format: None,
        };
        let entries = vec![MergeModule::inactive(&module)];
        let result = merge_overrides(MergePass::Update, &entries, None, Some(&variant)).expect("patch");
        assert_eq!(
            result.into_value(),
            json!({"data": {"url": "https://example.com/lod2/tileset.json", "time": {"updateClockOnLoad": true}}})
        );

        let explicit = Patch::leaf(Facet::Data, "url", json!("override.json"));
        let entries = vec![MergeModule::new(&module, Some(explicit.clone()))];
        assert_eq!(
            merge_overrides(MergePass::Update, &entries, None, Some(&variant)),
            Some(explicit)
        );
    }

    #[test]
    fn group_switch_refades_composed_color() {
        let transparency = StyleModule::new(
            "t",
            ModuleSettings::BuildingTransparency(BuildingTransparencySettings { transparency: 50 }),
        )
        .with_updated_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let switch = StyleModule::new("g", ModuleSettings::SwitchGroup(SwitchGroupSettings::default()));
        let color = shadow("c");
        let entries = vec![
            MergeModule::new(&transparency, Some(Patch::leaf(Facet::Tiles3d, "color", json!("color(\"#ffffff\", 0.5)")))),
            MergeModule::new(&switch, None),
            MergeModule::new(&color, Some(Patch::leaf(Facet::Tiles3d, "color", json!("color(\"#ff0000\", 1)")))),
        ];
        let result = merge_overrides(MergePass::Update, &entries, None, None).expect("patch");
        assert_eq!(
            result.get(Facet::Tiles3d, "color"),
            Some(&json!("color(\"#ff0000\", 0.5)"))
        );

        let without_switch = vec![entries[0].clone(), entries[2].clone()];
        let result = merge_overrides(MergePass::Update, &without_switch, None, None).expect("patch");
        assert_eq!(
            result.get(Facet::Tiles3d, "color"),
            Some(&json!("color(\"#ff0000\", 1)"))
        );
    }

    #[test]
    fn cleanse_pass_uses_cleanse_fragments() {
        let module = shadow("s");
        let entries = vec![MergeModule::new(&module, Some(Patch::leaf(Facet::Tiles3d, "shadows", json!("enabled"))))];
        let result = merge_overrides(MergePass::Cleanse, &entries, None, None).expect("patch");
        assert_eq!(result.get(Facet::Tiles3d, "shadows"), Some(&Value::Null));
    }
}
