//! Collaborator traits: where layer data comes from and where navigation goes.

use super::types::{Feature, FeatureId, LayerKind};
use crate::settings::LayerSelector;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A loaded map layer.
pub trait Layer: Send + Sync {
    /// Layer name, unique within a source.
    fn name(&self) -> &str;

    fn kind(&self) -> LayerKind;

    /// Names of the layer's attribute fields.
    fn field_names(&self) -> Vec<String>;

    /// Enumerate features in layer order.
    fn features(&self) -> Box<dyn Iterator<Item = Feature> + '_>;

    /// Fetch a single feature by id.
    fn feature(&self, id: FeatureId) -> Option<Feature> {
        self.features().find(|f| f.id == id)
    }
}

/// The set of layers currently loaded in the host application.
///
/// All operations are synchronous; the index builder calls them from its
/// worker thread.
pub trait LayerSource: Send + Sync {
    /// Every loaded layer, in enumeration order.
    fn layers(&self) -> Vec<Arc<dyn Layer>>;

    /// Loaded vector layers, in enumeration order.
    fn vector_layers(&self) -> Vec<Arc<dyn Layer>> {
        self.layers()
            .into_iter()
            .filter(|layer| layer.kind() == LayerKind::Vector)
            .collect()
    }

    fn layer_by_name(&self, name: &str) -> Option<Arc<dyn Layer>> {
        self.layers().into_iter().find(|layer| layer.name() == name)
    }

    /// Resolve a configuration selector to concrete layers.
    ///
    /// A named selector that matches nothing resolves to an empty list.
    fn resolve(&self, selector: &LayerSelector) -> Vec<Arc<dyn Layer>> {
        match selector {
            LayerSelector::AllLayers => self.vector_layers(),
            LayerSelector::Named(name) => self.layer_by_name(name).into_iter().collect(),
        }
    }
}

/// Selection broadcast: layer name to the selected features on that layer.
pub type Selection = BTreeMap<String, Vec<Feature>>;

/// Map view and selection handling in the host application.
pub trait MapNavigator: Send + Sync {
    /// Bring the map view to the front.
    fn show_map(&self);

    /// Pan and zoom the map to the given features of a layer.
    fn zoom_to_features(&self, layer: &str, ids: &[FeatureId]);

    /// Broadcast that the selection changed.
    fn selection_changed(&self, selection: &Selection);
}
