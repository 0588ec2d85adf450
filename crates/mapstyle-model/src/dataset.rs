use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::module::StyleModule;

/// One selectable data source of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigVariant {
    pub name: String,
    pub url: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub data: Vec<ConfigVariant>,
}

/// A dataset with its ordered style modules and selection state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub modules: Vec<StyleModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_dataset_variant: Option<ConfigVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<DatasetConfig>,
}

impl Dataset {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_modules(mut self, modules: Vec<StyleModule>) -> Self {
        self.modules = modules;
        self
    }

    /// Whether more than one data variant is configured.
    #[must_use]
    pub fn is_multi_variant(&self) -> bool {
        self.config.as_ref().is_some_and(|config| config.data.len() > 1)
    }

    #[must_use]
    pub fn module(&self, id: &str) -> Option<&StyleModule> {
        self.modules.iter().find(|module| module.id == id)
    }

    /// Insert a module, replacing an existing one with the same id in place.
    pub fn upsert_module(&mut self, module: StyleModule) {
        match self.modules.iter_mut().find(|existing| existing.id == module.id) {
            Some(existing) => *existing = module,
            None => self.modules.push(module),
        }
    }

    /// Remove a module by id, returning it.
    pub fn remove_module(&mut self, id: &str) -> Option<StyleModule> {
        let index = self.modules.iter().position(|module| module.id == id)?;
        Some(self.modules.remove(index))
    }

    /// Select a variant by name. Unknown names clear the selection.
    pub fn select_variant(&mut self, name: &str) {
        self.selected_dataset_variant = self
            .config
            .as_ref()
            .and_then(|config| config.data.iter().find(|variant| variant.name == name))
            .cloned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleSettings, SwitchDatasetSettings};

    fn variant(name: &str) -> ConfigVariant {
        ConfigVariant {
            name: name.to_string(),
            url: format!("https://example.com/{name}/tileset.json"),
            format: Some("3dtiles".to_string()),
        }
    }

    #[test]
    fn multi_variant_requires_two_entries() {
        let mut dataset = Dataset::new("d1");
        assert!(!dataset.is_multi_variant());
        dataset.config = Some(DatasetConfig {
            data: vec![variant("lod1")],
        });
        assert!(!dataset.is_multi_variant());
        dataset.config = Some(DatasetConfig {
            data: vec![variant("lod1"), variant("lod2")],
        });
        assert!(dataset.is_multi_variant());
    }

    #[test]
    fn select_variant_holds_at_most_one() {
        let mut dataset = Dataset::new("d1");
        dataset.config = Some(DatasetConfig {
            data: vec![variant("lod1"), variant("lod2")],
        });
        dataset.select_variant("lod2");
        assert_eq!(
            dataset.selected_dataset_variant.as_ref().map(|v| v.name.as_str()),
            Some("lod2")
        );
        dataset.select_variant("missing");
        assert!(dataset.selected_dataset_variant.is_none());
    }

    #[test]
    fn upsert_and_remove_module() {
        let mut dataset = Dataset::new("d1");
        let module = StyleModule::new("sd", ModuleSettings::SwitchDataset(SwitchDatasetSettings {}));
        dataset.upsert_module(module.clone());
        dataset.upsert_module(module.clone().with_group("g1"));
        assert_eq!(dataset.modules.len(), 1);
        assert_eq!(dataset.modules[0].group.as_deref(), Some("g1"));
        assert!(dataset.remove_module("sd").is_some());
        assert!(dataset.remove_module("sd").is_none());
    }
}
