//! Two-table index schema: FTS4 `search` table plus `featureinfo` lookup.

use crate::config::SearchConfig;
use crate::Result;
use rusqlite::Connection;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Table names and tokenizer of an index artifact.
#[derive(Debug, Clone)]
pub struct FtsConfig {
    /// Name of the FTS4 virtual table.
    pub table_name: String,
    /// Name of the id → (layer, featureid) lookup table.
    pub lookup_table: String,
    /// Tokenizer configuration.
    pub tokenizer: String,
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            table_name: SearchConfig::SEARCH_TABLE.to_string(),
            lookup_table: SearchConfig::LOOKUP_TABLE.to_string(),
            tokenizer: SearchConfig::TOKENIZER.to_string(),
        }
    }
}

/// Quote an identifier for use in SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema manager for one index artifact.
///
/// The full-text table has exactly one column per indexed field, in the
/// order given by `fields`.
pub struct FtsSchema<'a> {
    config: &'a FtsConfig,
    fields: Vec<String>,
}

impl<'a> FtsSchema<'a> {
    pub fn new(config: &'a FtsConfig, fields: &BTreeSet<String>) -> Self {
        Self {
            config,
            fields: fields.iter().cloned().collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Check that both tables exist.
    pub fn tables_exist(config: &FtsConfig, conn: &Connection) -> Result<bool> {
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN (?1, ?2)",
            [&config.table_name, &config.lookup_table],
            |row| row.get(0),
        )?;
        Ok(count == 2)
    }

    /// Drop both tables if present.
    pub fn drop_tables(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {};
             DROP TABLE IF EXISTS {};",
            quote_identifier(&self.config.table_name),
            quote_identifier(&self.config.lookup_table),
        ))?;
        debug!(
            "Dropped tables {} and {}",
            self.config.table_name, self.config.lookup_table
        );
        Ok(())
    }

    /// Create the lookup table and the FTS4 table.
    pub fn create_tables(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            &format!(
                "CREATE TABLE {} (id INTEGER PRIMARY KEY, layer, featureid)",
                quote_identifier(&self.config.lookup_table)
            ),
            [],
        )?;

        let mut columns: Vec<String> = self.fields.iter().map(|f| quote_identifier(f)).collect();
        columns.push(format!("tokenize={}", self.config.tokenizer));
        conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE {} USING fts4({})",
                quote_identifier(&self.config.table_name),
                columns.join(", ")
            ),
            [],
        )?;

        info!(
            "Created index tables {} ({} columns) and {}",
            self.config.table_name,
            self.fields.len(),
            self.config.lookup_table
        );
        Ok(())
    }

    /// Drop and recreate both tables.
    pub fn recreate(&self, conn: &Connection) -> Result<()> {
        self.drop_tables(conn)?;
        self.create_tables(conn)
    }

    /// `INSERT` into the lookup table; params: id, layer, featureid.
    pub fn lookup_insert_sql(&self) -> String {
        format!(
            "INSERT INTO {}(id, layer, featureid) VALUES (?1, ?2, ?3)",
            quote_identifier(&self.config.lookup_table)
        )
    }

    /// `INSERT` into the full-text table; params: docid then one per field.
    pub fn search_insert_sql(&self) -> String {
        let columns: Vec<String> = std::iter::once("docid".to_string())
            .chain(self.fields.iter().map(|f| quote_identifier(f)))
            .collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        format!(
            "INSERT INTO {}({}) VALUES ({})",
            quote_identifier(&self.config.table_name),
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// Merge the FTS4 b-tree segments.
    pub fn optimize(&self, conn: &Connection) -> Result<()> {
        let table = quote_identifier(&self.config.table_name);
        conn.execute(
            &format!("INSERT INTO {}({}) VALUES('optimize')", table, table),
            [],
        )?;
        debug!("Optimized FTS index {}", self.config.table_name);
        Ok(())
    }

    /// Get statistics about an existing index.
    pub fn stats(config: &FtsConfig, conn: &Connection) -> Result<IndexStats> {
        let table = quote_identifier(&config.table_name);
        let record_count: usize = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(&config.lookup_table)),
            [],
            |row| row.get(0),
        )?;

        let stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 0", table))?;
        let fields = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        Ok(IndexStats {
            table_name: config.table_name.clone(),
            record_count,
            fields,
        })
    }
}

/// Statistics about a built index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IndexStats {
    pub table_name: String,
    pub record_count: usize,
    pub fields: Vec<String>,
}
