//! featuresearch - full-text search over the attribute data of map layers.
//!
//! Configured attribute columns of vector layers are indexed into an SQLite
//! FTS4 database; queries return ranked, highlighted snippets that resolve
//! back to map features.
//!
//! The host application plugs in through three traits: [`LayerSource`]
//! (loaded layers), [`MapNavigator`] (zoom and selection) and
//! [`SearchPanel`] (the search UI). [`SearchSession`] drives the whole
//! lifecycle; the lower-level pieces can be used on their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use featuresearch::{CancellationToken, GeoJsonLayerSource, IndexBuilder, Project, QueryEngine};
//! use std::sync::Arc;
//!
//! fn main() -> featuresearch::Result<()> {
//!     let project = Project::load("town.json")?;
//!     let layers = Arc::new(GeoJsonLayerSource::from_dir("layers")?);
//!
//!     let builder = IndexBuilder::new("/tmp/town-index", project.index_config()?, layers);
//!     let built = builder.build(&CancellationToken::new())?;
//!
//!     for hit in QueryEngine::new(&built.path).search("hydrant", false) {
//!         println!("{}", hit.display_text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod index;
pub mod layers;
pub mod paths;
pub mod resolver;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use config::{SearchConfig, UiText};
pub use error::{Result, SearchError};
pub use index::{
    BuiltIndex, FeatureExtractor, FeatureRecord, IndexBuildTask, IndexBuilder, IndexStats,
    QueryEngine, SearchHit,
};
pub use layers::{
    AttributeValue, Feature, FeatureId, GeoJsonLayerSource, Layer, LayerKind, LayerSource,
    MapNavigator, MemoryLayer, MemoryLayerSource, Selection,
};
pub use resolver::{ResultEntry, ResultResolver};
pub use session::{BuildStatus, MessageLevel, SearchPanel, SearchSession};
pub use settings::{IndexConfig, LayerIndexConfig, LayerSelector, Project};
