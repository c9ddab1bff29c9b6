//! Index build pipeline.
//!
//! A build is full and destructive: both tables are dropped and recreated,
//! then every configured feature is streamed in and committed once. The
//! drop/create step commits on its own, so a failed or cancelled build leaves
//! empty tables behind rather than the previous contents.

use super::extract::{FeatureExtractor, FeatureRecord};
use super::schema::{FtsConfig, FtsSchema};
use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::layers::LayerSource;
use crate::paths;
use crate::settings::IndexConfig;
use crate::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of a completed build.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltIndex {
    /// Path of the index database.
    pub path: PathBuf,
    /// Wall-clock time from opening the database to closing it.
    pub elapsed: Duration,
    /// Number of feature records written.
    pub record_count: usize,
    pub built_at: DateTime<Utc>,
}

impl BuiltIndex {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Builds the index artifact for one project.
pub struct IndexBuilder {
    index_dir: PathBuf,
    config: IndexConfig,
    layers: Arc<dyn LayerSource>,
    fts_config: FtsConfig,
    optimize: bool,
}

impl IndexBuilder {
    /// Create a builder writing `<index_dir>/index.db`.
    pub fn new(
        index_dir: impl Into<PathBuf>,
        config: IndexConfig,
        layers: Arc<dyn LayerSource>,
    ) -> Self {
        Self {
            index_dir: index_dir.into(),
            config,
            layers,
            fts_config: FtsConfig::default(),
            optimize: true,
        }
    }

    /// Merge FTS segments after loading (default: on).
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_fts_config(mut self, fts_config: FtsConfig) -> Self {
        self.fts_config = fts_config;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        paths::index_db_path(&self.index_dir)
    }

    /// Run the build on the current thread.
    ///
    /// `cancel` is checked before the tables are dropped and before each
    /// record. On cancellation or failure the insert transaction is rolled
    /// back and the connection closed.
    pub fn build(&self, cancel: &CancellationToken) -> Result<BuiltIndex> {
        let start = Instant::now();
        let db_path = self.db_path();
        info!("Building search index at {}", db_path.display());

        paths::ensure_dir(&self.index_dir)?;
        let mut conn = Connection::open(&db_path)?;
        configure_connection(&conn)?;

        let fields = self.config.indexed_fields();
        let schema = FtsSchema::new(&self.fts_config, &fields);
        // Dropping the tables commits on its own; a stale build must not get here
        cancel.check()?;
        schema.recreate(&conn)?;

        let record_count = {
            let tx = conn.transaction()?;
            let count = {
                let mut lookup_stmt = tx.prepare(&schema.lookup_insert_sql())?;
                let mut search_stmt = tx.prepare(&schema.search_insert_sql())?;

                FeatureExtractor::new(self.layers.as_ref()).extract(&self.config, |record| {
                    cancel.check()?;
                    insert_record(&mut lookup_stmt, &mut search_stmt, schema.fields(), &record)
                })?
            };

            if self.optimize {
                schema.optimize(&tx)?;
            }
            tx.commit()?;
            count
        };

        if let Err((_, e)) = conn.close() {
            warn!("Failed to close index connection cleanly: {}", e);
        }

        let built = BuiltIndex {
            path: db_path,
            elapsed: start.elapsed(),
            record_count,
            built_at: Utc::now(),
        };
        info!(
            "Index built in: {:.3} seconds ({} records)",
            built.elapsed_secs(),
            built.record_count
        );
        Ok(built)
    }
}

/// Connection settings shared by builder and query connections.
pub(crate) fn configure_connection(conn: &Connection) -> Result<()> {
    conn.busy_timeout(SearchConfig::BUSY_TIMEOUT)?;
    conn.execute_batch(
        "
        PRAGMA synchronous=NORMAL;
        PRAGMA temp_store=MEMORY;
        ",
    )?;
    Ok(())
}

fn insert_record(
    lookup_stmt: &mut rusqlite::Statement<'_>,
    search_stmt: &mut rusqlite::Statement<'_>,
    fields: &[String],
    record: &FeatureRecord,
) -> Result<()> {
    lookup_stmt.execute(params![record.id, record.layer, record.feature_id.0])?;

    // Absent columns stay NULL
    let values = std::iter::once(Value::Integer(record.id)).chain(fields.iter().map(|field| {
        record
            .fields
            .get(field)
            .map(|text| Value::Text(text.clone()))
            .unwrap_or(Value::Null)
    }));
    search_stmt.execute(params_from_iter(values))?;

    debug!(
        "Indexed {}:{} as {}",
        record.layer, record.feature_id, record.id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{Feature, MemoryLayer, MemoryLayerSource};
    use crate::SearchError;
    use serde_json::json;
    use tempfile::TempDir;

    fn layers() -> Arc<dyn LayerSource> {
        Arc::new(
            MemoryLayerSource::new()
                .with_layer(
                    MemoryLayer::vector("hydrants", ["name", "street"])
                        .with_feature(Feature::new(1).with("name", "hydrant north"))
                        .with_feature(Feature::new(2).with("name", "valve").with("street", "Main St"))
                        .with_feature(Feature::new(3).with("name", "hydrant south")),
                )
                .with_layer(
                    MemoryLayer::vector("roads", ["street"])
                        .with_feature(Feature::new(10).with("street", "High St")),
                ),
        )
    }

    fn config(value: serde_json::Value) -> IndexConfig {
        IndexConfig::from_search_settings(&value).unwrap()
    }

    #[test]
    fn test_build_writes_both_tables() {
        let temp = TempDir::new().unwrap();
        let builder = IndexBuilder::new(
            temp.path().join("idx"),
            config(json!({ "_all": { "columns": ["street"] }, "hydrants": { "columns": ["name"] } })),
            layers(),
        );

        let built = builder.build(&CancellationToken::new()).unwrap();
        assert_eq!(built.path, temp.path().join("idx").join("index.db"));
        assert!(built.path.exists());
        // street: hydrant 2 + road 10; name: hydrants 1, 2, 3
        assert_eq!(built.record_count, 5);

        let conn = Connection::open(&built.path).unwrap();
        let stats = FtsSchema::stats(&FtsConfig::default(), &conn).unwrap();
        assert_eq!(stats.record_count, 5);
        assert_eq!(stats.fields, vec!["name", "street"]);

        let ids: Vec<i64> = conn
            .prepare("SELECT id FROM featureinfo ORDER BY rowid")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let (layer, fid): (String, i64) = conn
            .query_row(
                "SELECT layer, featureid FROM featureinfo WHERE id = 3",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!((layer.as_str(), fid), ("hydrants", 1));
    }

    #[test]
    fn test_absent_columns_are_null() {
        let temp = TempDir::new().unwrap();
        let built = IndexBuilder::new(
            temp.path(),
            config(json!({ "hydrants": { "columns": ["name", "street"] } })),
            layers(),
        )
        .build(&CancellationToken::new())
        .unwrap();

        let conn = Connection::open(&built.path).unwrap();
        let (name, street): (Option<String>, Option<String>) = conn
            .query_row(
                "SELECT name, street FROM search WHERE docid = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(name.as_deref(), Some("name: hydrant north"));
        assert!(street.is_none());

        let empty_rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM search WHERE name IS NULL AND street IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(empty_rows, 0);
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let temp = TempDir::new().unwrap();
        let first = IndexBuilder::new(
            temp.path(),
            config(json!({ "_all": { "columns": ["street"] } })),
            layers(),
        )
        .build(&CancellationToken::new())
        .unwrap();
        assert_eq!(first.record_count, 2);

        let second = IndexBuilder::new(
            temp.path(),
            config(json!({ "roads": { "columns": ["street"] } })),
            layers(),
        )
        .with_optimize(false)
        .build(&CancellationToken::new())
        .unwrap();
        assert_eq!(second.record_count, 1);
        assert_eq!(first.path, second.path);

        let conn = Connection::open(&second.path).unwrap();
        let stats = FtsSchema::stats(&FtsConfig::default(), &conn).unwrap();
        assert_eq!(stats.record_count, 1);
    }

    #[test]
    fn test_cancelled_build_leaves_existing_index() {
        let temp = TempDir::new().unwrap();
        let builder = IndexBuilder::new(
            temp.path(),
            config(json!({ "_all": { "columns": ["street"] } })),
            layers(),
        );
        builder.build(&CancellationToken::new()).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(builder.build(&cancel), Err(SearchError::BuildCancelled)));

        let conn = Connection::open(builder.db_path()).unwrap();
        let stats = FtsSchema::stats(&FtsConfig::default(), &conn).unwrap();
        assert_eq!(stats.record_count, 2);
    }

    #[test]
    fn test_custom_table_names() {
        let temp = TempDir::new().unwrap();
        let fts_config = FtsConfig {
            table_name: "attrs".to_string(),
            lookup_table: "attrs_lookup".to_string(),
            ..FtsConfig::default()
        };
        let built = IndexBuilder::new(
            temp.path(),
            config(json!({ "roads": { "columns": ["street"] } })),
            layers(),
        )
        .with_fts_config(fts_config.clone())
        .build(&CancellationToken::new())
        .unwrap();

        let conn = Connection::open(&built.path).unwrap();
        assert!(FtsSchema::tables_exist(&fts_config, &conn).unwrap());
        assert!(!FtsSchema::tables_exist(&FtsConfig::default(), &conn).unwrap());
        assert_eq!(FtsSchema::stats(&fts_config, &conn).unwrap().record_count, 1);
    }

    #[test]
    fn test_storage_failure_is_an_error() {
        let temp = TempDir::new().unwrap();
        // A file where the index directory should be
        let blocker = temp.path().join("idx");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = IndexBuilder::new(
            &blocker,
            config(json!({ "_all": { "columns": ["street"] } })),
            layers(),
        )
        .build(&CancellationToken::new());
        assert!(result.is_err());
    }
}
