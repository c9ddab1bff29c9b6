//! Feature extraction: configured layer columns to flattened text records.

use crate::layers::{FeatureId, Layer, LayerSource};
use crate::settings::{IndexConfig, LayerIndexConfig};
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One indexable row: a feature's configured columns rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRecord {
    /// Synthetic id, unique and increasing within one build.
    pub id: i64,
    pub layer: String,
    pub feature_id: FeatureId,
    /// Column name to `"column: value"`.
    pub fields: BTreeMap<String, String>,
}

/// Walks the configured layers and emits `FeatureRecord`s.
///
/// One extractor holds one id sequence; ids keep increasing across layers and
/// configuration entries.
pub struct FeatureExtractor<'a> {
    layers: &'a dyn LayerSource,
    last_id: i64,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(layers: &'a dyn LayerSource) -> Self {
        Self { layers, last_id: 0 }
    }

    /// Emit a record for every feature of every configured layer.
    ///
    /// Returns the number of records emitted. An error returned by `emit`
    /// stops extraction and is propagated.
    pub fn extract<F>(&mut self, config: &IndexConfig, mut emit: F) -> Result<usize>
    where
        F: FnMut(FeatureRecord) -> Result<()>,
    {
        let mut emitted = 0;
        for (selector, entry) in config.entries() {
            let layers = self.layers.resolve(selector);
            if layers.is_empty() {
                debug!("No layers match selector '{}', skipping", selector);
                continue;
            }
            for layer in layers {
                emitted += self.extract_layer(layer.as_ref(), entry, &mut emit)?;
            }
        }
        Ok(emitted)
    }

    fn extract_layer<F>(
        &mut self,
        layer: &dyn Layer,
        entry: &LayerIndexConfig,
        emit: &mut F,
    ) -> Result<usize>
    where
        F: FnMut(FeatureRecord) -> Result<()>,
    {
        let fields = matching_fields(layer, entry);
        if fields.is_empty() {
            debug!("Layer '{}' has none of the configured columns", layer.name());
            return Ok(0);
        }

        let mut emitted = 0;
        for feature in layer.features() {
            let data: BTreeMap<String, String> = fields
                .iter()
                .filter_map(|field| {
                    feature
                        .attribute(field)
                        .map(|value| (field.clone(), format!("{}: {}", field, value)))
                })
                .collect();
            if data.is_empty() {
                continue;
            }

            self.last_id += 1;
            emit(FeatureRecord {
                id: self.last_id,
                layer: layer.name().to_string(),
                feature_id: feature.id,
                fields: data,
            })?;
            emitted += 1;
        }

        debug!(
            "Extracted {} records from layer '{}' ({} columns)",
            emitted,
            layer.name(),
            fields.len()
        );
        Ok(emitted)
    }
}

/// Configured columns that the layer actually has.
fn matching_fields(layer: &dyn Layer, entry: &LayerIndexConfig) -> BTreeSet<String> {
    let layer_fields: BTreeSet<String> = layer.field_names().into_iter().collect();
    entry
        .columns
        .iter()
        .filter(|c| layer_fields.contains(*c))
        .cloned()
        .collect()
}
