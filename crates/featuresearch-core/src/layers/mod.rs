//! Layer data and map navigation collaborators.
//!
//! The index builder and the result resolver never reach into the host
//! application directly; they go through these traits:
//! - `LayerSource` / `Layer` - loaded layers, their fields and features
//! - `MapNavigator` - zoom to features and broadcast the selection
//!
//! `MemoryLayerSource` and `GeoJsonLayerSource` are ready-made sources.

mod geojson;
mod memory;
mod traits;
mod types;

pub use geojson::GeoJsonLayerSource;
pub use memory::{MemoryLayer, MemoryLayerSource};
pub use traits::{Layer, LayerSource, MapNavigator, Selection};
pub use types::{AttributeValue, Feature, FeatureId, LayerKind};
