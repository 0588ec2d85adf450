//! Style module definitions.
//!
//! A [`StyleModule`] is one user-configurable unit contributing a partial
//! override to its dataset. The module `type` selects a [`ModuleSettings`]
//! variant, and through it the fragment generator and cleanse rule used by
//! the composition engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::patch::{Facet, Patch};

/// A stored style module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleModule {
    /// Unique within a dataset.
    pub id: String,
    /// Group the module belongs to, matched against the dataset's selected group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Explicit override fragment written by the editor surface.
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_patch: Option<Patch>,
    /// Stored inverse fragment applied when the module is deactivated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanse_override: Option<Patch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub settings: ModuleSettings,
}

impl StyleModule {
    pub fn new(id: impl Into<String>, settings: ModuleSettings) -> Self {
        Self {
            id: id.into(),
            group: None,
            override_patch: None,
            cleanse_override: None,
            updated_at: None,
            settings,
        }
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_override(mut self, patch: Patch) -> Self {
        self.override_patch = Some(patch);
        self
    }

    #[must_use]
    pub fn with_cleanse_override(mut self, patch: Patch) -> Self {
        self.cleanse_override = Some(patch);
        self
    }

    #[must_use]
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    #[must_use]
    pub fn module_type(&self) -> ModuleType {
        self.settings.module_type()
    }
}

/// Closed set of module kinds, used as the key of handler lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleType {
    Template,
    SwitchGroup,
    SwitchDataset,
    SwitchVisibility,
    PointColor,
    PolylineColor,
    PolygonColor,
    BuildingColor,
    BuildingFilter,
    BuildingTransparency,
    BuildingShadow,
    ColorGradient,
}

impl ModuleType {
    pub const ALL: [ModuleType; 12] = [
        Self::Template,
        Self::SwitchGroup,
        Self::SwitchDataset,
        Self::SwitchVisibility,
        Self::PointColor,
        Self::PolylineColor,
        Self::PolygonColor,
        Self::BuildingColor,
        Self::BuildingFilter,
        Self::BuildingTransparency,
        Self::BuildingShadow,
        Self::ColorGradient,
    ];

    /// Serialized `type` tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::SwitchGroup => "switchGroup",
            Self::SwitchDataset => "switchDataset",
            Self::SwitchVisibility => "switchVisibility",
            Self::PointColor => "pointColor",
            Self::PolylineColor => "polylineColor",
            Self::PolygonColor => "polygonColor",
            Self::BuildingColor => "buildingColor",
            Self::BuildingFilter => "buildingFilter",
            Self::BuildingTransparency => "buildingTransparency",
            Self::BuildingShadow => "buildingShadow",
            Self::ColorGradient => "colorGradient",
        }
    }
}

impl std::fmt::Display for ModuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific module settings, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModuleSettings {
    Template(TemplateSettings),
    SwitchGroup(SwitchGroupSettings),
    SwitchDataset(SwitchDatasetSettings),
    SwitchVisibility(SwitchVisibilitySettings),
    PointColor(ColorRuleSettings),
    PolylineColor(ColorRuleSettings),
    PolygonColor(ColorRuleSettings),
    BuildingColor(BuildingColorSettings),
    BuildingFilter(BuildingFilterSettings),
    BuildingTransparency(BuildingTransparencySettings),
    BuildingShadow(BuildingShadowSettings),
    ColorGradient(ColorGradientSettings),
}

impl ModuleSettings {
    #[must_use]
    pub fn module_type(&self) -> ModuleType {
        match self {
            Self::Template(_) => ModuleType::Template,
            Self::SwitchGroup(_) => ModuleType::SwitchGroup,
            Self::SwitchDataset(_) => ModuleType::SwitchDataset,
            Self::SwitchVisibility(_) => ModuleType::SwitchVisibility,
            Self::PointColor(_) => ModuleType::PointColor,
            Self::PolylineColor(_) => ModuleType::PolylineColor,
            Self::PolygonColor(_) => ModuleType::PolygonColor,
            Self::BuildingColor(_) => ModuleType::BuildingColor,
            Self::BuildingFilter(_) => ModuleType::BuildingFilter,
            Self::BuildingTransparency(_) => ModuleType::BuildingTransparency,
            Self::BuildingShadow(_) => ModuleType::BuildingShadow,
            Self::ColorGradient(_) => ModuleType::ColorGradient,
        }
    }
}

/// Reference to a reusable template plus local customization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
    #[serde(default, rename = "templateID", skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default)]
    pub user_settings: TemplateUserSettings,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUserSettings {
    /// Replaces the named template's components when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<StyleModule>>,
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_patch: Option<Patch>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchGroupSettings {
    #[serde(default)]
    pub groups: Vec<GroupItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Dataset variant switch. The selected variant lives on the dataset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchDatasetSettings {}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchVisibilitySettings {
    #[serde(default)]
    pub facet: Facet,
    #[serde(default)]
    pub items: Vec<VisibilityItem>,
    /// Ids of the items currently switched on.
    #[serde(default)]
    pub selected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub condition: Condition,
}

/// Rule-based coloring shared by point, polyline, and polygon modules.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorRuleSettings {
    #[serde(default)]
    pub rules: Vec<ColorRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub condition: Condition,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildingColorType {
    #[default]
    None,
    Height,
    Purpose,
    Structure,
    FloodRank,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingColorSettings {
    #[serde(default)]
    pub color_type: BuildingColorType,
    /// Attribute read by `floodRank`, which varies per hazard dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingFilterSettings {
    #[serde(default)]
    pub filters: Vec<RangeFilterSetting>,
}

/// A `[from, to]` window over a numeric attribute with domain `[min, max]`.
///
/// Missing bounds are filled from discovered attribute metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilterSetting {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub value: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingTransparencySettings {
    /// Opacity percentage, 100 is fully opaque.
    #[serde(default = "default_transparency")]
    pub transparency: u8,
}

impl Default for BuildingTransparencySettings {
    fn default() -> Self {
        Self {
            transparency: default_transparency(),
        }
    }
}

fn default_transparency() -> u8 {
    100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShadowMode {
    Disabled,
    #[default]
    Enabled,
    CastOnly,
    ReceiveOnly,
}

impl ShadowMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Enabled => "enabled",
            Self::CastOnly => "cast_only",
            Self::ReceiveOnly => "receive_only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingShadowSettings {
    #[serde(default)]
    pub shadow: ShadowMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorGradientSettings {
    #[serde(default = "default_gradient_facet")]
    pub facet: Facet,
    pub attribute: String,
    pub start_color: String,
    pub end_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

fn default_gradient_facet() -> Facet {
    Facet::Tiles3d
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_flattened_switch_dataset() {
        let module: StyleModule = serde_json::from_value(json!({
            "id": "sd",
            "type": "switchDataset",
            "cleanseOverride": {"data": {"url": null}}
        }))
        .expect("switchDataset module");
        assert_eq!(module.module_type(), ModuleType::SwitchDataset);
        assert!(module.cleanse_override.is_some());
        assert!(module.updated_at.is_none());
    }

    #[test]
    fn deserializes_template_with_nested_components() {
        let module: StyleModule = serde_json::from_value(json!({
            "id": "tpl",
            "type": "template",
            "templateID": "t-1",
            "userSettings": {
                "components": [
                    {"id": "shadow", "type": "buildingShadow", "shadow": "castOnly"}
                ]
            }
        }))
        .expect("template module");
        let ModuleSettings::Template(settings) = &module.settings else {
            panic!("expected template settings");
        };
        assert_eq!(settings.template_id.as_deref(), Some("t-1"));
        let components = settings.user_settings.components.as_ref().expect("components");
        assert_eq!(components[0].module_type(), ModuleType::BuildingShadow);
    }

    #[test]
    fn parses_timestamp_and_group() {
        let module: StyleModule = serde_json::from_value(json!({
            "id": "t",
            "type": "buildingTransparency",
            "group": "g1",
            "updatedAt": "2024-05-01T10:00:00Z",
            "transparency": 40
        }))
        .expect("transparency module");
        assert_eq!(module.group.as_deref(), Some("g1"));
        assert!(module.updated_at.is_some());
        assert_eq!(
            module.settings,
            ModuleSettings::BuildingTransparency(BuildingTransparencySettings { transparency: 40 })
        );
    }

    #[test]
    fn type_tags_match_serialized_names() {
        for module_type in ModuleType::ALL {
            assert!(!module_type.as_str().is_empty());
        }
        let module = StyleModule::new(
            "s",
            ModuleSettings::BuildingShadow(BuildingShadowSettings::default()),
        );
        let value = serde_json::to_value(&module).expect("serialize");
        assert_eq!(value["type"], json!(ModuleType::BuildingShadow.as_str()));
    }
}
