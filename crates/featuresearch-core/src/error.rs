//! Error types for featuresearch.
//!
//! Build-time errors end the build attempt they belong to; query-time errors
//! are recovered into empty result sets by the query engine. Nothing here is
//! meant to take down the host application.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the featuresearch library.
#[derive(Debug, Error)]
pub enum SearchError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Index lifecycle errors
    #[error("Search index has not been built: {path:?}")]
    IndexNotBuilt { path: Option<PathBuf> },

    #[error("Index build cancelled")]
    BuildCancelled,

    #[error("Index build failed: {message}")]
    BuildFailed { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for featuresearch operations.
pub type Result<T> = std::result::Result<T, SearchError>;

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(err: rusqlite::Error) -> Self {
        SearchError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SearchError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SearchError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// True when the error only reports that a build was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchError::BuildCancelled)
    }
}
