//! Map a search result back to a live feature and navigate to it.

use crate::index::SearchHit;
use crate::layers::{Feature, FeatureId, Layer, LayerSource, MapNavigator, Selection};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One row of the results list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ResultEntry {
    /// A ranked hit that can be jumped to.
    Hit(SearchHit),
    /// A non-navigable status line (e.g. "No Results").
    Status(String),
}

impl ResultEntry {
    pub fn status(text: impl Into<String>) -> Self {
        ResultEntry::Status(text.into())
    }

    pub fn display_text(&self) -> String {
        match self {
            ResultEntry::Hit(hit) => hit.display_text(),
            ResultEntry::Status(text) => text.clone(),
        }
    }

    pub fn hit(&self) -> Option<&SearchHit> {
        match self {
            ResultEntry::Hit(hit) => Some(hit),
            ResultEntry::Status(_) => None,
        }
    }
}

impl From<SearchHit> for ResultEntry {
    fn from(hit: SearchHit) -> Self {
        ResultEntry::Hit(hit)
    }
}

/// Resolves results against the currently loaded layers.
#[derive(Clone)]
pub struct ResultResolver {
    layers: Arc<dyn LayerSource>,
    navigator: Arc<dyn MapNavigator>,
}

impl ResultResolver {
    pub fn new(layers: Arc<dyn LayerSource>, navigator: Arc<dyn MapNavigator>) -> Self {
        Self { layers, navigator }
    }

    /// Look up the layer and feature a result points at.
    ///
    /// Returns `None` when the layer is no longer loaded or the feature id
    /// no longer exists on it.
    pub fn resolve(&self, layer: &str, feature_id: FeatureId) -> Option<(Arc<dyn Layer>, Feature)> {
        let Some(found) = self.layers.layer_by_name(layer) else {
            debug!("Result layer {} is not loaded", layer);
            return None;
        };
        let Some(feature) = found.feature(feature_id) else {
            debug!("Feature {} no longer exists on layer {}", feature_id, layer);
            return None;
        };
        Some((found, feature))
    }

    /// Bring the map forward, zoom to the result's feature and select it.
    ///
    /// Returns true if navigation happened. Status entries and results whose
    /// layer or feature has gone away are ignored.
    pub fn jump_to(&self, entry: &ResultEntry) -> bool {
        let Some(hit) = entry.hit() else {
            return false;
        };
        let Some((layer, feature)) = self.resolve(&hit.layer, hit.feature_id) else {
            return false;
        };

        self.navigator.show_map();
        self.navigator.zoom_to_features(layer.name(), &[feature.id]);

        let mut selection = Selection::new();
        selection.insert(layer.name().to_string(), vec![feature]);
        self.navigator.selection_changed(&selection);
        true
    }
}
