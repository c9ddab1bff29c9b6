//! Full-text index of layer attributes.
//!
//! Build side: `FeatureExtractor` → `IndexBuilder` (optionally wrapped in an
//! `IndexBuildTask`) writes an SQLite FTS4 artifact. Query side:
//! `QueryEngine` answers ranked, highlighted queries against it.

mod builder;
mod engine;
mod extract;
mod query;
mod rank;
mod schema;
mod task;

pub use builder::{BuiltIndex, IndexBuilder};
pub use engine::{QueryEngine, SearchHit};
pub use extract::{FeatureExtractor, FeatureRecord};
pub use query::{build_match_expression, prefix_term};
pub use rank::{decode_matchinfo, rank, register_rank_function, RANK_FUNCTION};
pub use schema::{quote_identifier, FtsConfig, FtsSchema, IndexStats};
pub use task::IndexBuildTask;
