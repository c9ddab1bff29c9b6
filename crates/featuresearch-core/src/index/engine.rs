//! Ranked query execution against a built index.

use super::builder::configure_connection;
use super::query::build_match_expression;
use super::rank::{register_rank_function, RANK_FUNCTION};
use super::schema::{quote_identifier, FtsConfig, FtsSchema, IndexStats};
use crate::config::SearchConfig;
use crate::layers::FeatureId;
use crate::{Result, SearchError};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub layer: String,
    pub feature_id: FeatureId,
    /// Matched text with terms wrapped in `[` and `]`, on one line.
    pub snippet: String,
}

impl SearchHit {
    /// Two-line label for a results list.
    pub fn display_text(&self) -> String {
        format!("{}\n {}", self.layer, self.snippet)
    }
}

/// Executes queries against one index artifact.
///
/// Every query opens its own connection; the artifact may be rebuilt
/// between (or during) queries.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    db_path: PathBuf,
    weights: Vec<f64>,
    limit: usize,
    fts_config: FtsConfig,
}

impl QueryEngine {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            weights: SearchConfig::DEFAULT_RANK_WEIGHTS.to_vec(),
            limit: SearchConfig::RESULT_LIMIT,
            fts_config: FtsConfig::default(),
        }
    }

    pub fn with_weights(mut self, weights: impl Into<Vec<f64>>) -> Self {
        self.weights = weights.into();
        self
    }

    /// Cap on returned rows; never above the default of 100.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(SearchConfig::RESULT_LIMIT);
        self
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Search the index. Failures of any kind yield an empty list.
    pub fn search(&self, text: &str, fuzzy: bool) -> Vec<SearchHit> {
        match self.try_search(text, fuzzy) {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Search for {:?} failed, returning no results: {}", text, e);
                Vec::new()
            }
        }
    }

    /// Search the index, reporting storage and syntax errors.
    pub fn try_search(&self, text: &str, fuzzy: bool) -> Result<Vec<SearchHit>> {
        let expression = build_match_expression(text, fuzzy);
        if expression.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let conn = self.open()?;
        if !FtsSchema::tables_exist(&self.fts_config, &conn)? {
            return Err(SearchError::IndexNotBuilt {
                path: Some(self.db_path.clone()),
            });
        }
        register_rank_function(&conn, &self.weights)?;

        let table = quote_identifier(&self.fts_config.table_name);
        let lookup = quote_identifier(&self.fts_config.lookup_table);
        let sql = format!(
            "SELECT info.layer, info.featureid, ranked.snippet
             FROM (
                 SELECT docid,
                        {rank}(matchinfo({table})) AS score,
                        snippet({table}, ?2, ?3, ?4) AS snippet
                 FROM {table}
                 WHERE {table} MATCH ?1
                 ORDER BY score DESC
                 LIMIT {limit}
             ) AS ranked
             JOIN {lookup} AS info ON info.id = ranked.docid
             ORDER BY ranked.score DESC",
            rank = RANK_FUNCTION,
            table = table,
            lookup = lookup,
            limit = self.limit,
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params![
                expression,
                SearchConfig::SNIPPET_START,
                SearchConfig::SNIPPET_END,
                SearchConfig::SNIPPET_ELLIPSIS
            ],
            |row| {
                let snippet: Option<String> = row.get(2)?;
                Ok(SearchHit {
                    layer: row.get(0)?,
                    feature_id: FeatureId(row.get(1)?),
                    snippet: normalize_snippet(&snippet.unwrap_or_default()),
                })
            },
        )?;

        let hits = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(
            "Query {:?} matched {} rows in {:.1}ms",
            expression,
            hits.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(hits)
    }

    /// Statistics of the current artifact.
    pub fn stats(&self) -> Result<IndexStats> {
        let conn = self.open()?;
        FtsSchema::stats(&self.fts_config, &conn)
    }

    /// Open the existing artifact read/write without creating it.
    fn open(&self) -> Result<Connection> {
        if !self.db_path.is_file() {
            return Err(SearchError::IndexNotBuilt {
                path: Some(self.db_path.clone()),
            });
        }
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        configure_connection(&conn)?;
        Ok(conn)
    }
}

/// Collapse line breaks in a snippet to single spaces.
fn normalize_snippet(snippet: &str) -> String {
    snippet.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::index::IndexBuilder;
    use crate::layers::{Feature, LayerSource, MemoryLayer, MemoryLayerSource};
    use crate::settings::IndexConfig;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn build(dir: &Path, layer: MemoryLayer, columns: serde_json::Value) -> PathBuf {
        let layers: Arc<dyn LayerSource> = Arc::new(MemoryLayerSource::new().with_layer(layer));
        let config = IndexConfig::from_search_settings(&columns).unwrap();
        IndexBuilder::new(dir, config, layers)
            .build(&CancellationToken::new())
            .unwrap()
            .path
    }

    fn assets() -> MemoryLayer {
        MemoryLayer::vector("assets", ["name", "street"])
            .with_feature(Feature::new(1).with("name", "hydrant").with("street", "Main Street"))
            .with_feature(Feature::new(2).with("name", "valve").with("street", "Mainland Road"))
            .with_feature(Feature::new(3).with("name", "hydrant hydrant hydrant").with("street", "High St"))
    }

    #[test]
    fn test_literal_match_with_snippets() {
        let temp = TempDir::new().unwrap();
        let db = build(temp.path(), assets(), json!({ "assets": { "columns": ["name", "street"] } }));
        let engine = QueryEngine::new(&db);

        let hits = engine.search("hydrant", false);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.layer == "assets"));
        assert!(hits.iter().all(|h| h.snippet.contains("[hydrant]")));
        // More occurrences rank first
        assert_eq!(hits[0].feature_id, FeatureId(3));
        assert_eq!(hits[1].feature_id, FeatureId(1));
    }

    #[test]
    fn test_fuzzy_prefix_match() {
        let temp = TempDir::new().unwrap();
        let db = build(temp.path(), assets(), json!({ "assets": { "columns": ["street"] } }));
        let engine = QueryEngine::new(&db);

        assert_eq!(engine.search("main", false).len(), 1);
        let mut ids: Vec<_> = engine
            .search("main", true)
            .into_iter()
            .map(|h| h.feature_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![FeatureId(1), FeatureId(2)]);

        // Terms are ANDed
        let both = engine.search("main roa", true);
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].feature_id, FeatureId(2));
    }

    #[test]
    fn test_empty_text_skips_storage() {
        let engine = QueryEngine::new("/nonexistent/index.db");
        assert!(engine.try_search("", false).unwrap().is_empty());
        assert!(engine.try_search("  ", true).unwrap().is_empty());
    }

    #[test]
    fn test_missing_artifact_is_no_results() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.db");
        let engine = QueryEngine::new(&path);

        assert!(matches!(
            engine.try_search("hydrant", false),
            Err(SearchError::IndexNotBuilt { .. })
        ));
        assert!(engine.search("hydrant", false).is_empty());
        // Querying must not create the artifact
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_tables_is_no_results() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x)")
            .unwrap();

        let engine = QueryEngine::new(&path);
        assert!(matches!(
            engine.try_search("hydrant", false),
            Err(SearchError::IndexNotBuilt { .. })
        ));
        assert!(engine.search("hydrant", false).is_empty());
    }

    #[test]
    fn test_result_limit_and_order() {
        let temp = TempDir::new().unwrap();
        let mut layer = MemoryLayer::vector("points", ["label"]);
        for i in 0..150 {
            let repeats = 1 + (i % 5) as usize;
            layer.push(Feature::new(i).with("label", vec!["pump"; repeats].join(" ")));
        }
        let db = build(temp.path(), layer, json!({ "points": { "columns": ["label"] } }));

        let engine = QueryEngine::new(&db);
        let hits = engine.search("pump", false);
        assert_eq!(hits.len(), 100);

        let conn = Connection::open(&db).unwrap();
        register_rank_function(&conn, &SearchConfig::DEFAULT_RANK_WEIGHTS).unwrap();
        let scores: Vec<f64> = hits
            .iter()
            .map(|hit| {
                conn.query_row(
                    "SELECT rank(matchinfo(search)) FROM search
                     JOIN featureinfo ON featureinfo.id = search.docid
                     WHERE search MATCH 'pump' AND featureinfo.featureid = ?1",
                    [hit.feature_id.0],
                    |row| row.get(0),
                )
                .unwrap()
            })
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        // The 30 top-scoring rows (five repeats) all made the cut
        assert!(scores[0] > scores[99]);

        assert_eq!(engine.clone().with_limit(10).search("pump", false).len(), 10);
        assert_eq!(engine.with_limit(500).search("pump", false).len(), 100);
    }

    #[test]
    fn test_snippet_newlines_collapsed() {
        assert_eq!(normalize_snippet("a\nb\r\nc"), "a b c");
        let hit = SearchHit {
            layer: "roads".into(),
            feature_id: FeatureId(4),
            snippet: "name: [main]".into(),
        };
        assert_eq!(hit.display_text(), "roads\n name: [main]");
    }

    #[test]
    fn test_stats() {
        let temp = TempDir::new().unwrap();
        let db = build(temp.path(), assets(), json!({ "assets": { "columns": ["name"] } }));
        let stats = QueryEngine::new(&db).stats().unwrap();
        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.fields, vec!["name"]);
    }
}
