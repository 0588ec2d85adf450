//! Runtime configuration.
//!
//! Read from a TOML file:
//!
//! ```toml
//! [debounce]
//! debounce_ms = 250
//! max_wait_ms = 1000
//!
//! [renderer]
//! timeout_ms = 5000
//!
//! [templates]
//! path = "templates.json"
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debounce::DebounceConfig;
use crate::error::{Result, RuntimeError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Metadata fetch debouncing.
    pub debounce: DebounceConfig,

    /// Renderer channel settings.
    pub renderer: RendererConfig,

    /// Template library location.
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Per-request reply timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// JSON file holding the template library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| RuntimeError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration, failing on unreadable or malformed files.
    pub fn try_load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load configuration, falling back to defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded runtime configuration");
                config
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "Using default runtime configuration"
                );
                Self::default()
            }
        }
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
