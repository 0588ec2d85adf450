//! Inputs a fragment generator may read beyond its own module.

use mapstyle_model::Patch;
use serde::{Deserialize, Serialize};

/// Observed domain of one feature attribute.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeDomain {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Shared context for one composition pass.
#[derive(Debug, Clone, Default)]
pub struct FragmentContext {
    /// Override currently applied by the renderer, if it was queried.
    pub existing_override: Option<Patch>,
    /// Attribute domains discovered from dataset metadata.
    pub attributes: Vec<AttributeDomain>,
}

impl FragmentContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_existing_override(mut self, patch: Option<Patch>) -> Self {
        self.existing_override = patch;
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<AttributeDomain>) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDomain> {
        self.attributes.iter().find(|domain| domain.name == name)
    }
}
