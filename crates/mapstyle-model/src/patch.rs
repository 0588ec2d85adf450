//! Renderer-facing override patches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::table::ConditionTable;

/// Top-level render facet of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Facet {
    #[default]
    #[serde(rename = "marker")]
    Marker,
    #[serde(rename = "polyline")]
    Polyline,
    #[serde(rename = "polygon")]
    Polygon,
    #[serde(rename = "3dtiles")]
    Tiles3d,
    #[serde(rename = "data")]
    Data,
}

impl Facet {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marker => "marker",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
            Self::Tiles3d => "3dtiles",
            Self::Data => "data",
        }
    }

    /// Name of the color property this facet exposes.
    #[must_use]
    pub fn color_property(&self) -> &'static str {
        match self {
            Self::Marker => "pointColor",
            Self::Polyline => "strokeColor",
            Self::Polygon => "fillColor",
            Self::Tiles3d => "color",
            Self::Data => "color",
        }
    }
}

/// Nested property tree keyed by facet.
///
/// Leaves are literals, `null` (reset to renderer default), or
/// `{ "expression": { "conditions": [...] } }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Patch with a single `facet.property = value` leaf.
    #[must_use]
    pub fn leaf(facet: Facet, property: &str, value: Value) -> Self {
        let mut patch = Self::new();
        patch.set(facet, property, value);
        patch
    }

    /// Wrap a JSON value; non-object values yield `None`.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Look up `facet.property`.
    #[must_use]
    pub fn get(&self, facet: Facet, property: &str) -> Option<&Value> {
        self.0.get(facet.as_str())?.as_object()?.get(property)
    }

    /// Set `facet.property`, creating the facet object when needed.
    ///
    /// A non-object value already stored under the facet is replaced.
    pub fn set(&mut self, facet: Facet, property: &str, value: Value) {
        let entry = self
            .0
            .entry(facet.as_str())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(property.to_string(), value);
        }
    }

    /// Keys of every facet present in the patch.
    pub fn facets(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Build an expression leaf `{ "expression": { "conditions": table } }`.
#[must_use]
pub fn expression_leaf(table: &ConditionTable) -> Value {
    json!({ "expression": { "conditions": table } })
}

/// Extract the condition table from an expression leaf.
///
/// Returns `None` for literals or malformed leaves.
#[must_use]
pub fn leaf_table(value: &Value) -> Option<ConditionTable> {
    let conditions = value.get("expression")?.get("conditions")?;
    serde_json::from_value(conditions.clone()).ok()
}
