//! GeoJSON-backed layer source.
//!
//! Every `*.geojson` / `*.json` FeatureCollection in a directory becomes one
//! vector layer named after the file stem. Geometry is ignored; only the
//! `properties` of each feature are read.

use super::memory::{MemoryLayer, MemoryLayerSource};
use super::traits::{Layer, LayerSource};
use super::types::{AttributeValue, Feature};
use crate::error::{Result, SearchError};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const LAYER_EXTENSIONS: &[&str] = &["geojson", "json"];

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<GeoJsonFeature>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonFeature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Layers loaded from GeoJSON files.
pub struct GeoJsonLayerSource {
    inner: MemoryLayerSource,
}

impl GeoJsonLayerSource {
    /// Load every GeoJSON file in `dir`, in file-name order.
    ///
    /// Files that are not FeatureCollections are skipped with a warning.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| SearchError::io_with_path(e, dir))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_layer_extension(path))
            .collect();
        paths.sort();

        let inner = MemoryLayerSource::new();
        for path in paths {
            match load_layer(&path) {
                Ok(layer) => {
                    debug!(
                        "Loaded layer '{}' with {} features from {}",
                        layer.name(),
                        layer.len(),
                        path.display()
                    );
                    inner.add_layer(layer);
                }
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        info!(
            "Loaded {} GeoJSON layers from {}",
            inner.layers().len(),
            dir.display()
        );
        Ok(Self { inner })
    }

    /// Load a single GeoJSON file as a layer source with one layer.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let inner = MemoryLayerSource::new();
        inner.add_layer(load_layer(path.as_ref())?);
        Ok(Self { inner })
    }
}

impl LayerSource for GeoJsonLayerSource {
    fn layers(&self) -> Vec<Arc<dyn Layer>> {
        self.inner.layers()
    }
}

fn has_layer_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| LAYER_EXTENSIONS.contains(&ext.as_str()))
}

fn load_layer(path: &Path) -> Result<MemoryLayer> {
    let text = std::fs::read_to_string(path).map_err(|e| SearchError::io_with_path(e, path))?;
    let collection: FeatureCollection = serde_json::from_str(&text)?;
    if collection.kind != "FeatureCollection" {
        return Err(SearchError::Validation {
            field: path.display().to_string(),
            message: format!("expected a FeatureCollection, found '{}'", collection.kind),
        });
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Field list: union of property keys in first-seen order
    let mut fields: Vec<String> = Vec::new();
    for feature in &collection.features {
        for key in feature.properties.iter().flat_map(|p| p.keys()) {
            if !fields.contains(key) {
                fields.push(key.clone());
            }
        }
    }

    let ids = assign_feature_ids(&collection.features);
    let mut layer = MemoryLayer::vector(name, fields);
    for (raw, id) in collection.features.into_iter().zip(ids) {
        let mut feature = Feature::new(id);
        for (key, value) in raw.properties.into_iter().flatten() {
            feature
                .attributes
                .insert(key, AttributeValue::from(&value));
        }
        layer.push(feature);
    }

    Ok(layer)
}

/// Feature ids for one layer, unique within it.
///
/// The first feature carrying a given integer `id` keeps it. Features with
/// no integer id (absent, string, or already taken) are numbered in file
/// order after the largest kept id.
fn assign_feature_ids(features: &[GeoJsonFeature]) -> Vec<i64> {
    let mut taken = HashSet::new();
    let kept: Vec<Option<i64>> = features
        .iter()
        .map(|feature| {
            feature
                .id
                .as_ref()
                .and_then(serde_json::Value::as_i64)
                .filter(|id| taken.insert(*id))
        })
        .collect();

    let mut next = taken.iter().max().map_or(0, |max| max.saturating_add(1));
    kept.into_iter()
        .map(|id| {
            id.unwrap_or_else(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::types::FeatureId;
    use tempfile::TempDir;

    const HYDRANTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 10, "geometry": null,
             "properties": {"name": "hydrant north", "pressure": 40}},
            {"type": "Feature", "geometry": null,
             "properties": {"name": "valve", "street": "Main St"}}
        ]
    }"#;

    #[test]
    fn test_load_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("hydrants.geojson"), HYDRANTS).unwrap();
        std::fs::write(temp.path().join("notes.txt"), "not a layer").unwrap();
        std::fs::write(temp.path().join("broken.json"), "{").unwrap();

        let source = GeoJsonLayerSource::from_dir(temp.path()).unwrap();
        let layers = source.layers();
        assert_eq!(layers.len(), 1);

        let layer = &layers[0];
        assert_eq!(layer.name(), "hydrants");
        assert_eq!(layer.field_names(), vec!["name", "pressure", "street"]);
        assert!(layer.feature(FeatureId(10)).is_some());
        // No id member: numbered after the largest explicit id
        let second = layer.feature(FeatureId(11)).unwrap();
        assert_eq!(
            second.attribute("street"),
            Some(&AttributeValue::Text("Main St".to_string()))
        );
    }

    #[test]
    fn test_mixed_ids_stay_unique() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("assets.geojson");
        std::fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "id": 1, "properties": {"name": "alpha"}},
                {"type": "Feature", "properties": {"name": "hydrant"}},
                {"type": "Feature", "id": "valve-7", "properties": {"name": "valve"}},
                {"type": "Feature", "id": 1, "properties": {"name": "beta"}}
            ]}"#,
        )
        .unwrap();

        let layers = GeoJsonLayerSource::from_file(&path).unwrap().layers();
        let layer = &layers[0];
        let ids: Vec<FeatureId> = layer.features().map(|f| f.id).collect();
        assert_eq!(ids, vec![FeatureId(1), FeatureId(2), FeatureId(3), FeatureId(4)]);

        let name = |id| layer.feature(FeatureId(id)).unwrap().attribute("name").cloned();
        assert_eq!(name(1), Some(AttributeValue::Text("alpha".to_string())));
        assert_eq!(name(2), Some(AttributeValue::Text("hydrant".to_string())));
        assert_eq!(name(3), Some(AttributeValue::Text("valve".to_string())));
        assert_eq!(name(4), Some(AttributeValue::Text("beta".to_string())));
    }

    #[test]
    fn test_rejects_non_collection() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("point.geojson");
        std::fs::write(&path, r#"{"type": "Feature", "properties": {}}"#).unwrap();
        assert!(GeoJsonLayerSource::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_dir() {
        assert!(GeoJsonLayerSource::from_dir("/nonexistent/layers/dir").is_err());
    }
}
