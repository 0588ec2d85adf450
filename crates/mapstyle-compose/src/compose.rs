//! One full composition pass over a dataset.

use mapstyle_model::{ConfigVariant, Dataset, ModuleType, Patch, StyleModule, TemplateLibrary};

use crate::context::FragmentContext;
use crate::flatten::{Activation, flatten, partition_modules, resolve_activation};
use crate::fragment::fragment_for;
use crate::merge::{MergeModule, MergePass, merge_into, merge_overrides};

/// Result of [`compose`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    /// Patch to hand to the renderer, `None` when there is nothing to send.
    pub patch: Option<Patch>,
    pub activation: Activation,
}

/// Compose the override patch for `dataset`.
///
/// Inactive modules are cleansed first, starting from `carried` (the cleanse
/// fragment of a module removed since the previous pass), then active
/// modules are merged on top.
///
/// Transparency fragments read the renderer's override with this pass's
/// cleanse and the other active fragments merged over it, so a color this
/// pass removes or replaces is never faded back in.
#[must_use]
pub fn compose(
    dataset: &Dataset,
    templates: &TemplateLibrary,
    ctx: &FragmentContext,
    carried: Option<&Patch>,
) -> Composition {
    let flattened = flatten(&dataset.modules, templates);
    let activation = resolve_activation(&flattened, dataset);
    let (active, inactive) = partition_modules(&flattened, &activation);

    let inactive_entries: Vec<MergeModule<'_>> =
        inactive.into_iter().map(MergeModule::inactive).collect();
    let cleanse = merge_overrides(MergePass::Cleanse, &inactive_entries, carried, None);

    let variant = dataset.selected_dataset_variant.as_ref();
    let mut active_entries: Vec<MergeModule<'_>> = active
        .into_iter()
        .map(|module| {
            let fragment = if reads_pass_color(module) {
                None
            } else {
                fragment_for(module, ctx)
            };
            MergeModule::new(module, fragment)
        })
        .collect();
    let pass_ctx = pass_context(ctx, cleanse.as_ref(), &active_entries, variant);
    for entry in &mut active_entries {
        if reads_pass_color(entry.module) {
            entry.fragment = fragment_for(entry.module, &pass_ctx);
        }
    }
    let update = merge_overrides(MergePass::Update, &active_entries, None, variant);

    let patch = match (cleanse, update) {
        (Some(mut base), Some(update)) => {
            merge_into(&mut base, &update);
            Some(base)
        }
        (cleanse, update) => update.or(cleanse),
    };

    tracing::debug!(
        dataset = %dataset.id,
        modules = flattened.len(),
        active = activation.active.len(),
        inactive = activation.inactive.len(),
        carried = carried.is_some(),
        empty = patch.is_none(),
        "Composed override patch"
    );

    Composition { patch, activation }
}

fn reads_pass_color(module: &StyleModule) -> bool {
    module.module_type() == ModuleType::BuildingTransparency
}

/// Context whose existing override reflects what this pass already decided.
fn pass_context(
    ctx: &FragmentContext,
    cleanse: Option<&Patch>,
    entries: &[MergeModule<'_>],
    variant: Option<&ConfigVariant>,
) -> FragmentContext {
    let independent: Vec<MergeModule<'_>> = entries
        .iter()
        .filter(|entry| !reads_pass_color(entry.module))
        .cloned()
        .collect();
    let produced = merge_overrides(MergePass::Update, &independent, None, variant);
    let mut existing = ctx.existing_override.clone().unwrap_or_default();
    for layer in [cleanse, produced.as_ref()].into_iter().flatten() {
        merge_into(&mut existing, layer);
    }
    FragmentContext {
        existing_override: (!existing.is_empty()).then_some(existing),
        attributes: ctx.attributes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapstyle_model::{
        BuildingColorSettings, BuildingColorType, BuildingShadowSettings,
        BuildingTransparencySettings, Facet, ModuleSettings, ShadowMode,
    };
    use serde_json::{Value, json};

    fn shadow(id: &str, shadow: ShadowMode) -> StyleModule {
        StyleModule::new(id, ModuleSettings::BuildingShadow(BuildingShadowSettings { shadow }))
    }

    #[test]
    fn inactive_modules_are_cleansed_under_active_ones() {
        let mut dataset = Dataset::new("d").with_modules(vec![
            shadow("day", ShadowMode::Enabled).with_group("day"),
            shadow("night", ShadowMode::Disabled).with_group("night"),
        ]);
        dataset.selected_group = Some("day".to_string());
        let composition = compose(&dataset, &TemplateLibrary::default(), &FragmentContext::new(), None);
        assert_eq!(composition.activation.active, vec!["day"]);
        assert_eq!(composition.activation.inactive, vec!["night"]);
        let patch = composition.patch.expect("patch");
        assert_eq!(patch.get(Facet::Tiles3d, "shadows"), Some(&json!("enabled")));
    }

    #[test]
    fn carried_cleanse_survives_when_nothing_overwrites_it() {
        let dataset = Dataset::new("d").with_modules(vec![shadow("s", ShadowMode::CastOnly)]);
        let carried = Patch::leaf(Facet::Tiles3d, "color", Value::Null);
        let composition = compose(
            &dataset,
            &TemplateLibrary::default(),
            &FragmentContext::new(),
            Some(&carried),
        );
        let patch = composition.patch.expect("patch");
        assert_eq!(patch.get(Facet::Tiles3d, "color"), Some(&Value::Null));
        assert_eq!(patch.get(Facet::Tiles3d, "shadows"), Some(&json!("cast_only")));
    }

    #[test]
    fn transparency_fades_the_color_composed_in_this_pass() {
        let dataset = Dataset::new("d").with_modules(vec![
            StyleModule::new(
                "plain",
                ModuleSettings::BuildingColor(BuildingColorSettings {
                    color_type: BuildingColorType::None,
                    attribute: None,
                }),
            ),
            StyleModule::new(
                "fade",
                ModuleSettings::BuildingTransparency(BuildingTransparencySettings { transparency: 50 }),
            ),
        ]);
        let stale = Patch::leaf(Facet::Tiles3d, "color", json!("color(\"#00ff00\", 1)"));
        let ctx = FragmentContext::new().with_existing_override(Some(stale));
        let first = compose(&dataset, &TemplateLibrary::default(), &ctx, None);
        // The renderer now holds the first pass's result; the next pass must agree.
        let ctx = FragmentContext::new().with_existing_override(first.patch.clone());
        let second = compose(&dataset, &TemplateLibrary::default(), &ctx, None);
        assert_eq!(first.patch, second.patch);
        assert_eq!(
            first.patch.and_then(|p| p.get(Facet::Tiles3d, "color").cloned()),
            Some(json!("color(\"#ffffff\", 0.5)"))
        );
    }

    #[test]
    fn empty_dataset_sends_nothing() {
        let composition = compose(
            &Dataset::new("d"),
            &TemplateLibrary::default(),
            &FragmentContext::new(),
            None,
        );
        assert!(composition.patch.is_none());
        assert!(composition.activation.active.is_empty());
    }
}
