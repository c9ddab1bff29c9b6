//! In-memory layers.

use super::traits::{Layer, LayerSource};
use super::types::{Feature, FeatureId, LayerKind};
use std::sync::{Arc, RwLock};

/// A layer whose fields and features are held in memory.
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    name: String,
    kind: LayerKind,
    fields: Vec<String>,
    features: Vec<Feature>,
}

impl MemoryLayer {
    /// Create an empty vector layer with the given fields.
    pub fn vector<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Vector,
            fields: fields.into_iter().map(Into::into).collect(),
            features: Vec::new(),
        }
    }

    /// Create a layer with no attribute table (e.g. a raster basemap).
    pub fn raster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: LayerKind::Raster,
            fields: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Builder-style feature append.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Layer for MemoryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> LayerKind {
        self.kind
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn features(&self) -> Box<dyn Iterator<Item = Feature> + '_> {
        Box::new(self.features.iter().cloned())
    }

    fn feature(&self, id: FeatureId) -> Option<Feature> {
        self.features.iter().find(|f| f.id == id).cloned()
    }
}

/// A layer source over a mutable list of layers.
///
/// Layers can be added and removed while a session is running; every build
/// sees the layers loaded at the moment it resolves its selectors.
#[derive(Default)]
pub struct MemoryLayerSource {
    layers: RwLock<Vec<Arc<dyn Layer>>>,
}

impl MemoryLayerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style layer append.
    pub fn with_layer(self, layer: impl Layer + 'static) -> Self {
        self.add_layer(layer);
        self
    }

    pub fn add_layer(&self, layer: impl Layer + 'static) {
        self.add_shared(Arc::new(layer));
    }

    pub fn add_shared(&self, layer: Arc<dyn Layer>) {
        let mut layers = self.layers.write().unwrap_or_else(|e| e.into_inner());
        layers.push(layer);
    }

    /// Remove a layer by name. Returns true if a layer was removed.
    pub fn remove_layer(&self, name: &str) -> bool {
        let mut layers = self.layers.write().unwrap_or_else(|e| e.into_inner());
        let before = layers.len();
        layers.retain(|layer| layer.name() != name);
        layers.len() != before
    }
}

impl LayerSource for MemoryLayerSource {
    fn layers(&self) -> Vec<Arc<dyn Layer>> {
        self.layers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
