//! Attribute metadata sources.
//!
//! Metadata documents look like
//! `{"attributes": {"計測高さ": {"min": 0, "max": 310.5}, "用途": {"values": ["業務施設"]}}}`.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::PathBuf;

use mapstyle_compose::AttributeDomain;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, RuntimeError};

/// Asynchronous source of attribute metadata documents.
pub trait MetadataSource: Send + Sync + 'static {
    fn fetch_metadata(&self, dataset_id: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    attributes: BTreeMap<String, RawDomain>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDomain {
    min: Option<f64>,
    max: Option<f64>,
    values: Vec<Value>,
}

fn value_label(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Parse a metadata document into attribute domains.
///
/// Malformed documents yield no attributes.
pub fn parse_attribute_domains(json: &str) -> Vec<AttributeDomain> {
    match serde_json::from_str::<MetadataDocument>(json) {
        Ok(document) => document
            .attributes
            .into_iter()
            .map(|(name, raw)| AttributeDomain {
                name,
                min: raw.min,
                max: raw.max,
                values: raw.values.into_iter().map(value_label).collect(),
            })
            .collect(),
        Err(error) => {
            tracing::warn!(error = %error, "Malformed metadata document, no attributes used");
            Vec::new()
        }
    }
}

/// Metadata documents held in memory, keyed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    documents: HashMap<String, String>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, dataset_id: impl Into<String>, json: impl Into<String>) -> Self {
        self.documents.insert(dataset_id.into(), json.into());
        self
    }
}

impl MetadataSource for StaticMetadata {
    async fn fetch_metadata(&self, dataset_id: &str) -> Result<String> {
        self.documents
            .get(dataset_id)
            .cloned()
            .ok_or_else(|| RuntimeError::Metadata {
                dataset_id: dataset_id.to_string(),
                message: "no metadata document".to_string(),
            })
    }
}

/// Metadata read from one JSON file for every dataset.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    path: PathBuf,
}

impl FileMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetadataSource for FileMetadata {
    async fn fetch_metadata(&self, dataset_id: &str) -> Result<String> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::read_to_string(&path).map_err(|source| RuntimeError::Io {
                operation: "read",
                path,
                source,
            })
        })
        .await
        .map_err(|error| RuntimeError::Metadata {
            dataset_id: dataset_id.to_string(),
            message: error.to_string(),
        })?
    }
}
