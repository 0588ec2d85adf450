//! Template expansion and activation resolution.

use std::collections::BTreeSet;

use mapstyle_model::{
    Dataset, ModuleSettings, ModuleType, StyleModule, TemplateLibrary, TemplateSettings,
};

/// Nesting limit for templates that reference other templates.
pub const MAX_TEMPLATE_DEPTH: usize = 8;

/// Expand every template module into itself followed by its components.
///
/// Components come from the module's own `userSettings.components` when set,
/// otherwise from the named template. A missing template contributes no
/// components.
#[must_use]
pub fn flatten(modules: &[StyleModule], templates: &TemplateLibrary) -> Vec<StyleModule> {
    let mut flattened = Vec::with_capacity(modules.len());
    flatten_into(modules, templates, 0, &mut flattened);
    flattened
}

fn flatten_into(
    modules: &[StyleModule],
    templates: &TemplateLibrary,
    depth: usize,
    out: &mut Vec<StyleModule>,
) {
    for module in modules {
        out.push(module.clone());
        let ModuleSettings::Template(settings) = &module.settings else {
            continue;
        };
        if depth >= MAX_TEMPLATE_DEPTH {
            tracing::warn!(
                module = %module.id,
                depth,
                "Template nesting limit reached, components skipped"
            );
            continue;
        }
        flatten_into(template_components(settings, templates), templates, depth + 1, out);
    }
}

/// Components a template module expands to.
#[must_use]
pub fn template_components<'a>(
    settings: &'a TemplateSettings,
    templates: &'a TemplateLibrary,
) -> &'a [StyleModule] {
    if let Some(components) = &settings.user_settings.components {
        return components;
    }
    let Some(template_id) = settings.template_id.as_deref() else {
        return &[];
    };
    match templates.get(template_id) {
        Some(template) => &template.components,
        None => {
            tracing::debug!(template_id, "Template not found, no components contributed");
            &[]
        }
    }
}

/// Whether `module` takes part in the current selection.
///
/// Group switches are never excluded by group; dataset switches require a
/// multi-variant dataset; every other grouped module must match the
/// selected group when one is selected.
#[must_use]
pub fn is_module_active(module: &StyleModule, dataset: &Dataset) -> bool {
    match module.module_type() {
        ModuleType::SwitchGroup => return true,
        ModuleType::SwitchDataset if !dataset.is_multi_variant() => return false,
        _ => {}
    }
    match (module.group.as_deref(), dataset.selected_group.as_deref()) {
        (Some(group), Some(selected)) => group == selected,
        _ => true,
    }
}

/// Partition of module ids for one composition pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Activation {
    /// Active ids in first-seen order.
    pub active: Vec<String>,
    /// Ids never active in this pass, in first-seen order.
    pub inactive: Vec<String>,
}

impl Activation {
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|active| active == id)
    }
}

/// Compute active and inactive ids over a flattened module list.
///
/// An id active in any occurrence is active, so the two lists never share
/// an id.
#[must_use]
pub fn resolve_activation(flattened: &[StyleModule], dataset: &Dataset) -> Activation {
    let mut active_set = BTreeSet::new();
    let mut activation = Activation::default();
    for module in flattened {
        if is_module_active(module, dataset) && active_set.insert(module.id.as_str()) {
            activation.active.push(module.id.clone());
        }
    }
    let mut seen_inactive = BTreeSet::new();
    for module in flattened {
        if !active_set.contains(module.id.as_str()) && seen_inactive.insert(module.id.as_str()) {
            activation.inactive.push(module.id.clone());
        }
    }
    activation
}

/// First occurrence of every module, split by activation.
#[must_use]
pub fn partition_modules<'a>(
    flattened: &'a [StyleModule],
    activation: &Activation,
) -> (Vec<&'a StyleModule>, Vec<&'a StyleModule>) {
    let mut seen = BTreeSet::new();
    let mut active = Vec::new();
    let mut inactive = Vec::new();
    for module in flattened {
        if !seen.insert(module.id.as_str()) {
            continue;
        }
        if activation.is_active(&module.id) {
            active.push(module);
        } else {
            inactive.push(module);
        }
    }
    (active, inactive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstyle_model::{
        BuildingShadowSettings, ConfigVariant, DatasetConfig, SwitchDatasetSettings,
        SwitchGroupSettings, Template, TemplateUserSettings,
    };

    fn shadow(id: &str) -> StyleModule {
        StyleModule::new(id, ModuleSettings::BuildingShadow(BuildingShadowSettings::default()))
    }

    fn template_module(id: &str, template_id: Option<&str>, components: Option<Vec<StyleModule>>) -> StyleModule {
        StyleModule::new(
            id,
            ModuleSettings::Template(TemplateSettings {
                template_id: template_id.map(str::to_string),
                user_settings: TemplateUserSettings {
                    components,
                    override_patch: None,
                },
            }),
        )
    }

    fn library() -> TemplateLibrary {
        TemplateLibrary::new(vec![Template {
            id: "t1".to_string(),
            name: "Buildings".to_string(),
            components: vec![shadow("x"), shadow("y")],
        }])
    }

    fn ids(modules: &[StyleModule]) -> Vec<&str> {
        modules.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn expands_named_template_in_order() {
        let modules = vec![template_module("tpl", Some("t1"), None), shadow("after")];
        let flattened = flatten(&modules, &library());
        assert_eq!(ids(&flattened), vec!["tpl", "x", "y", "after"]);
    }

    #[test]
    fn user_components_take_precedence() {
        let modules = vec![template_module("tpl", Some("t1"), Some(vec![shadow("own")]))];
        let flattened = flatten(&modules, &library());
        assert_eq!(ids(&flattened), vec!["tpl", "own"]);
    }

    #[test]
    fn dangling_template_contributes_nothing() {
        let modules = vec![template_module("tpl", Some("missing"), None)];
        assert_eq!(ids(&flatten(&modules, &library())), vec!["tpl"]);
    }

    #[test]
    fn self_referencing_template_terminates() {
        let library = TemplateLibrary::new(vec![Template {
            id: "loop".to_string(),
            name: String::new(),
            components: vec![template_module("inner", Some("loop"), None)],
        }]);
        let flattened = flatten(&[template_module("outer", Some("loop"), None)], &library);
        assert_eq!(flattened.len(), MAX_TEMPLATE_DEPTH + 1);
    }

    #[test]
    fn group_membership_controls_activation() {
        let module = shadow("m").with_group("g1");
        let mut dataset = Dataset::new("d");
        assert!(is_module_active(&module, &dataset));
        dataset.selected_group = Some("g1".to_string());
        assert!(is_module_active(&module, &dataset));
        dataset.selected_group = Some("g2".to_string());
        assert!(!is_module_active(&module, &dataset));

        let switch = StyleModule::new("sg", ModuleSettings::SwitchGroup(SwitchGroupSettings::default()))
            .with_group("g1");
        assert!(is_module_active(&switch, &dataset));
    }

    #[test]
    fn switch_dataset_needs_multiple_variants() {
        let switch = StyleModule::new("sd", ModuleSettings::SwitchDataset(SwitchDatasetSettings {}));
        let mut dataset = Dataset::new("d");
        assert!(!is_module_active(&switch, &dataset));
        dataset.config = Some(DatasetConfig {
            data: vec![
                ConfigVariant {
                    name: "a".to_string(),
                    url: "a.json".to_string(),
                    format: None,
                },
                ConfigVariant {
                    name: "b".to_string(),
                    url: "b.json".to_string(),
                    format: None,
                },
            ],
        });
        assert!(is_module_active(&switch, &dataset));
    }

    #[test]
    fn partitions_never_overlap() {
        let mut dataset = Dataset::new("d");
        dataset.selected_group = Some("g1".to_string());
        let modules = vec![
            shadow("a").with_group("g1"),
            shadow("b").with_group("g2"),
            shadow("a").with_group("g2"),
            shadow("c"),
        ];
        let activation = resolve_activation(&modules, &dataset);
        assert_eq!(activation.active, vec!["a", "c"]);
        assert_eq!(activation.inactive, vec!["b"]);

        let (active, inactive) = partition_modules(&modules, &activation);
        assert_eq!(active.len(), 2);
        assert_eq!(inactive.len(), 1);
        assert_eq!(active[0].group.as_deref(), Some("g1"));
    }
}
