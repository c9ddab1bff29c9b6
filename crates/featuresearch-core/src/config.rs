//! Centralized configuration constants for featuresearch.

use std::time::Duration;

/// Search index and query parameters.
pub struct SearchConfig;

impl SearchConfig {
    /// File name of the index artifact inside a project's index directory.
    pub const INDEX_FILE_NAME: &'static str = "index.db";
    /// Full-text table holding one text column per indexed field.
    pub const SEARCH_TABLE: &'static str = "search";
    /// Lookup table mapping synthetic ids to (layer, feature id).
    pub const LOOKUP_TABLE: &'static str = "featureinfo";
    /// Tokenizer for the FTS4 table.
    pub const TOKENIZER: &'static str = "unicode61";
    /// Maximum number of rows returned per query.
    pub const RESULT_LIMIT: usize = 100;
    /// Rank weights: first matched position dominates the second, the rest are ignored.
    pub const DEFAULT_RANK_WEIGHTS: [f64; 4] = [1.0, 0.1, 0.0, 0.0];
    pub const SNIPPET_START: &'static str = "[";
    pub const SNIPPET_END: &'static str = "]";
    pub const SNIPPET_ELLIPSIS: &'static str = "...";
    /// Selector that expands to every loaded vector layer.
    pub const ALL_LAYERS_SELECTOR: &'static str = "_all";
    /// Key under the project settings that holds the index configuration.
    pub const SETTINGS_KEY: &'static str = "search";
    /// How long a connection waits on a locked database before failing.
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Directory layout for index artifacts.
pub struct PathsConfig;

impl PathsConfig {
    /// Directory created under the per-user storage root.
    pub const APP_DIR_NAME: &'static str = "featuresearch";
}

/// Status strings shown in the results list and message bar.
pub struct UiText;

impl UiText {
    pub const BUILDING: &'static str = "building search index...";
    pub const NO_RESULTS: &'static str = "No Results";
    pub const INVALID_CONFIG_STATUS: &'static str = "Invalid search config found";
    pub const MESSAGE_TITLE: &'static str = "Searching";
    pub const INVALID_CONFIG_MESSAGE: &'static str = "Invalid search config.";
    pub const BUILD_FAILED: &'static str = "Search index build failed";
}
