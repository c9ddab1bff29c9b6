//! Project settings and index configuration.
//!
//! The index configuration lives under the `search` key of a project's
//! settings document:
//!
//! ```json
//! {
//!   "search": {
//!     "_all":     { "columns": ["name"] },
//!     "hydrants": { "columns": ["street", "asset_id"] }
//!   }
//! }
//! ```
//!
//! Validation is all-or-nothing: one malformed entry invalidates the whole
//! configuration.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Which layers a configuration entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerSelector {
    /// Every vector layer loaded at build time.
    AllLayers,
    /// Exactly one layer, looked up by name.
    Named(String),
}

impl LayerSelector {
    pub fn parse(key: &str) -> Self {
        if key == SearchConfig::ALL_LAYERS_SELECTOR {
            LayerSelector::AllLayers
        } else {
            LayerSelector::Named(key.to_string())
        }
    }
}

impl fmt::Display for LayerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerSelector::AllLayers => write!(f, "{}", SearchConfig::ALL_LAYERS_SELECTOR),
            LayerSelector::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Columns to index for one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerIndexConfig {
    pub columns: Vec<String>,
}

/// Validated index configuration, in settings order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexConfig {
    entries: Vec<(LayerSelector, LayerIndexConfig)>,
}

impl IndexConfig {
    /// Build a configuration from explicit entries, validating each one.
    pub fn new(entries: Vec<(LayerSelector, LayerIndexConfig)>) -> Result<Self> {
        for (selector, entry) in &entries {
            validate_entry(selector, entry)?;
        }
        Ok(Self { entries })
    }

    /// Parse the value stored under the `search` key.
    pub fn from_search_settings(value: &serde_json::Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| SearchError::Config {
            message: "search settings must be a mapping of layer to {\"columns\": [...]}"
                .to_string(),
        })?;

        let mut entries = Vec::with_capacity(map.len());
        for (key, layer_value) in map {
            let entry: LayerIndexConfig = serde_json::from_value(layer_value.clone())
                .map_err(|e| SearchError::Validation {
                    field: key.clone(),
                    message: format!("expected {{\"columns\": [..]}}: {}", e),
                })?;
            entries.push((LayerSelector::parse(key), entry));
        }

        Self::new(entries)
    }

    /// Parse a whole project settings document.
    pub fn from_project_settings(settings: &serde_json::Value) -> Result<Self> {
        let search = settings
            .get(SearchConfig::SETTINGS_KEY)
            .ok_or_else(|| SearchError::Config {
                message: format!(
                    "project settings have no '{}' section",
                    SearchConfig::SETTINGS_KEY
                ),
            })?;
        Self::from_search_settings(search)
    }

    pub fn entries(&self) -> &[(LayerSelector, LayerIndexConfig)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of configured columns across all entries.
    ///
    /// This is exactly the column set of the full-text table.
    pub fn indexed_fields(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|(_, entry)| entry.columns.iter().cloned())
            .collect()
    }
}

fn validate_entry(selector: &LayerSelector, entry: &LayerIndexConfig) -> Result<()> {
    if entry.columns.is_empty() {
        return Err(SearchError::Validation {
            field: selector.to_string(),
            message: "columns must not be empty".to_string(),
        });
    }
    if entry.columns.iter().any(|c| c.trim().is_empty()) {
        return Err(SearchError::Validation {
            field: selector.to_string(),
            message: "column names must not be blank".to_string(),
        });
    }
    Ok(())
}

/// A loaded project (workspace): its name and raw settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl Project {
    pub fn new(name: impl Into<String>, settings: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// Load a project file (`{"name": ..., "settings": {...}}`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| SearchError::io_with_path(e, path))?;
        let project: Project = serde_json::from_str(&text)?;
        Ok(project)
    }

    /// Validated index configuration for this project.
    pub fn index_config(&self) -> Result<IndexConfig> {
        IndexConfig::from_project_settings(&self.settings)
    }
}
