//! Terminal stand-ins for the map view and the search panel.

use featuresearch::{FeatureId, MapNavigator, MessageLevel, ResultEntry, SearchPanel, Selection};
use std::sync::Mutex;
use tracing::{error, warn};

/// Prints navigation requests instead of moving a map.
#[derive(Debug, Default)]
pub struct ConsoleNavigator;

impl MapNavigator for ConsoleNavigator {
    fn show_map(&self) {
        println!("-> map");
    }

    fn zoom_to_features(&self, layer: &str, ids: &[FeatureId]) {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        println!("-> zoom to {} [{}]", layer, ids.join(", "));
    }

    fn selection_changed(&self, selection: &Selection) {
        for (layer, features) in selection {
            for feature in features {
                let attributes: Vec<String> = feature
                    .attributes
                    .iter()
                    .map(|(field, value)| format!("{}={}", field, value))
                    .collect();
                println!("-> selected {}:{} {}", layer, feature.id, attributes.join(" "));
            }
        }
    }
}

/// Prints the results list and remembers it for `:jump`.
#[derive(Default)]
pub struct ConsolePanel {
    entries: Mutex<Vec<ResultEntry>>,
}

impl ConsolePanel {
    /// Entry `number` (1-based) of the list last shown.
    pub fn entry(&self, number: usize) -> Option<ResultEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        number
            .checked_sub(1)
            .and_then(|index| entries.get(index))
            .cloned()
    }
}

impl SearchPanel for ConsolePanel {
    fn set_search_enabled(&self, enabled: bool) {
        if enabled {
            println!("(search ready)");
        }
    }

    fn set_search_visible(&self, visible: bool) {
        if !visible {
            println!("(search unavailable for this project)");
        }
    }

    fn show_entries(&self, entries: &[ResultEntry], enabled: bool) {
        for (number, entry) in entries.iter().enumerate() {
            if enabled {
                println!("{:>3}. {}", number + 1, entry.display_text());
            } else {
                println!("     {}", entry.display_text());
            }
        }
        *self.entries.lock().unwrap_or_else(|e| e.into_inner()) = entries.to_vec();
    }

    fn raise_message(&self, title: &str, message: &str, level: MessageLevel) {
        match level {
            MessageLevel::Warning => warn!("{}: {}", title, message),
            MessageLevel::Critical => error!("{}: {}", title, message),
        }
    }
}
