//! Index artifact locations.
//!
//! Each project gets its own directory under a per-user storage root:
//! `{storage_root}/featuresearch/{project}/index.db`.

use crate::config::{PathsConfig, SearchConfig};
use crate::error::{Result, SearchError};
use std::path::{Path, PathBuf};

/// Get the default storage root for index artifacts.
///
/// # Platform Behavior
/// Uses the `dirs` crate data directory:
/// - **Linux**: `~/.local/share`
/// - **Windows**: `%APPDATA%`
/// - **macOS**: `~/Library/Application Support`
pub fn default_storage_root() -> Result<PathBuf> {
    dirs::data_dir().ok_or_else(|| SearchError::Config {
        message: "Could not determine user data directory".to_string(),
    })
}

/// Directory holding the index artifact for a project.
pub fn index_dir(storage_root: &Path, project_name: &str) -> PathBuf {
    storage_root
        .join(PathsConfig::APP_DIR_NAME)
        .join(sanitize_project_name(project_name))
}

/// Path of the index database inside an index directory.
pub fn index_db_path(index_dir: &Path) -> PathBuf {
    index_dir.join(SearchConfig::INDEX_FILE_NAME)
}

/// Create a directory (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| SearchError::Io {
            message: format!("Failed to create directory {}", dir.display()),
            path: Some(dir.to_path_buf()),
            source: Some(e),
        })?;
    }
    Ok(())
}

/// Keep a project name usable as a single path component.
fn sanitize_project_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_dir_layout() {
        let dir = index_dir(Path::new("/data"), "Town Assets");
        assert_eq!(dir, PathBuf::from("/data/featuresearch/Town Assets"));
        assert_eq!(
            index_db_path(&dir),
            PathBuf::from("/data/featuresearch/Town Assets/index.db")
        );
    }

    #[test]
    fn test_project_name_cannot_escape_root() {
        let dir = index_dir(Path::new("/data"), "../other");
        assert_eq!(dir, PathBuf::from("/data/featuresearch/.._other"));
        assert_eq!(
            index_dir(Path::new("/data"), ".."),
            PathBuf::from("/data/featuresearch/_")
        );
    }

    #[test]
    fn test_ensure_dir_creates_parents() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        ensure_dir(&dir).unwrap();
    }
}
