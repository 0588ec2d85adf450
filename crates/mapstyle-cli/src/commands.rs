//! Command implementations, independent of argument parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, info_span, warn};

use mapstyle_compose::tables::{
    BUILDING_PURPOSE, BUILDING_PURPOSE_ATTRIBUTE, BUILDING_STRUCTURE,
    BUILDING_STRUCTURE_ATTRIBUTE, FLOOD_RANK, HEIGHT_ATTRIBUTE, HEIGHT_BANDS, categorical_table,
    gradient_color_table, gradient_domain, numeric_range_table,
};
use mapstyle_compose::{
    Composition, FragmentContext, compose, flatten, merge_into, removal_cleanse,
};
use mapstyle_model::{ConditionTable, Dataset, Patch, StyleModule, TemplateLibrary};
use mapstyle_runtime::{RuntimeConfig, parse_attribute_domains};

/// Inputs of one `compose` run.
#[derive(Debug, Clone, Default)]
pub struct ComposeRequest {
    pub dataset: PathBuf,
    pub templates: Option<PathBuf>,
    pub existing: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub group: Option<String>,
    pub variant: Option<String>,
    /// Module ids removed before composing; their cleanse is carried in.
    pub remove: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComposeOutcome {
    pub dataset: Dataset,
    pub flattened: Vec<StyleModule>,
    pub composition: Composition,
}

fn read_file(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {what} {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> RuntimeConfig {
    path.map_or_else(RuntimeConfig::default, RuntimeConfig::load_from)
}

/// Template library from `--templates`, else the configured path, else empty.
pub fn load_templates(path: Option<&Path>, config: &RuntimeConfig) -> Result<TemplateLibrary> {
    let Some(path) = path.or(config.templates.path.as_deref()) else {
        return Ok(TemplateLibrary::default());
    };
    let json = read_file(path, "templates")?;
    let library = TemplateLibrary::from_json_str(&json)
        .with_context(|| format!("parse templates {}", path.display()))?;
    debug!(path = %path.display(), templates = library.len(), "Loaded template library");
    Ok(library)
}

fn load_existing(path: Option<&Path>) -> Result<Option<Patch>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let json = read_file(path, "existing override")?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("parse existing override {}", path.display()))?;
    match Patch::from_value(value) {
        Some(patch) => Ok(Some(patch)),
        None => bail!("existing override {} is not a JSON object", path.display()),
    }
}

fn load_context(request: &ComposeRequest) -> Result<FragmentContext> {
    let attributes = match request.metadata.as_deref() {
        Some(path) => parse_attribute_domains(&read_file(path, "metadata")?),
        None => Vec::new(),
    };
    Ok(FragmentContext::new()
        .with_existing_override(load_existing(request.existing.as_deref())?)
        .with_attributes(attributes))
}

pub fn run_compose(request: &ComposeRequest) -> Result<ComposeOutcome> {
    let span = info_span!("compose", dataset = %request.dataset.display());
    let _guard = span.enter();

    let config = load_config(request.config.as_deref());
    let templates = load_templates(request.templates.as_deref(), &config)?;
    let mut dataset = Dataset::from_json_str(&read_file(&request.dataset, "dataset")?)
        .with_context(|| format!("parse dataset {}", request.dataset.display()))?;

    if let Some(group) = &request.group {
        dataset.selected_group = Some(group.clone());
    }
    if let Some(variant) = &request.variant {
        dataset.select_variant(variant);
        if dataset.selected_dataset_variant.is_none() {
            bail!("dataset {} has no variant named {variant}", dataset.id);
        }
    }

    let mut carried: Option<Patch> = None;
    for id in &request.remove {
        let Some(module) = dataset.remove_module(id) else {
            warn!(module = %id, "Module to remove not found");
            continue;
        };
        if let Some(cleanse) = removal_cleanse(&module, &templates) {
            match carried.as_mut() {
                Some(existing) => merge_into(existing, &cleanse),
                None => carried = Some(cleanse),
            }
        }
    }

    let ctx = load_context(request)?;
    let composition = compose(&dataset, &templates, &ctx, carried.as_ref());
    let flattened = flatten(&dataset.modules, &templates);
    info!(
        modules = flattened.len(),
        active = composition.activation.active.len(),
        "Composition complete"
    );
    Ok(ComposeOutcome {
        dataset,
        flattened,
        composition,
    })
}

/// Built-in lookup tables and gradients.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRequest {
    Height,
    Purpose,
    Structure,
    FloodRank {
        attribute: String,
    },
    Gradient {
        attribute: String,
        start: String,
        end: String,
        min: f64,
        max: f64,
        step: f64,
    },
}

const DEFAULT_TABLE_COLOR: &str = "#ffffff";

pub fn build_table(request: &TableRequest) -> Result<ConditionTable> {
    let table = match request {
        TableRequest::Height => {
            numeric_range_table(HEIGHT_ATTRIBUTE, HEIGHT_BANDS, Some(0.0), DEFAULT_TABLE_COLOR)
        }
        TableRequest::Purpose => {
            categorical_table(BUILDING_PURPOSE_ATTRIBUTE, BUILDING_PURPOSE, DEFAULT_TABLE_COLOR)
        }
        TableRequest::Structure => categorical_table(
            BUILDING_STRUCTURE_ATTRIBUTE,
            BUILDING_STRUCTURE,
            DEFAULT_TABLE_COLOR,
        ),
        TableRequest::FloodRank { attribute } => {
            numeric_range_table(attribute, FLOOD_RANK, None, DEFAULT_TABLE_COLOR)
        }
        TableRequest::Gradient {
            attribute,
            start,
            end,
            min,
            max,
            step,
        } => {
            let domain = gradient_domain(Some(*min), Some(*max), Some(*step));
            if domain.is_empty() {
                bail!("gradient domain is empty for min {min}, max {max}, step {step}");
            }
            gradient_color_table(attribute, start, end, &domain, DEFAULT_TABLE_COLOR)
        }
    };
    Ok(table)
}
