//! End-to-end tests: GeoJSON layers on disk, a project settings document,
//! a built index and ranked queries against it.

use featuresearch::{
    BuildStatus, CancellationToken, FeatureId, GeoJsonLayerSource, IndexBuilder, LayerSource,
    MapNavigator, MessageLevel, Project, QueryEngine, ResultEntry, SearchPanel, SearchSession,
    Selection, UiText,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const ASSETS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "id": 1, "geometry": null,
         "properties": {"name": "hydrant", "street": "Main Street", "pressure": 40}},
        {"type": "Feature", "id": 2, "geometry": null,
         "properties": {"name": "valve", "street": "High Street"}},
        {"type": "Feature", "id": 3, "geometry": null,
         "properties": {"name": "hydrant", "street": "Mainland Road"}}
    ]
}"#;

const ROADS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "id": 7, "geometry": null,
         "properties": {"street": "Harbour Road", "surface": "asphalt"}}
    ]
}"#;

/// Create a layer directory with two GeoJSON layers.
fn create_layers() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(temp_dir.path().join("assets.geojson"), ASSETS).unwrap();
    std::fs::write(temp_dir.path().join("roads.geojson"), ROADS).unwrap();
    temp_dir
}

fn load_layers(dir: &TempDir) -> Arc<dyn LayerSource> {
    Arc::new(GeoJsonLayerSource::from_dir(dir.path()).unwrap())
}

fn project() -> Project {
    Project::new(
        "town",
        json!({
            "search": {
                "assets": { "columns": ["name"] },
                "_all": { "columns": ["street"] }
            }
        }),
    )
}

#[test]
fn test_build_and_query() {
    let layers_dir = create_layers();
    let index_dir = TempDir::new().unwrap();

    let config = project().index_config().unwrap();
    let built = IndexBuilder::new(index_dir.path(), config, load_layers(&layers_dir))
        .build(&CancellationToken::new())
        .unwrap();
    // 3 asset names + 3 asset streets + 1 road street
    assert_eq!(built.record_count, 7);

    let engine = QueryEngine::new(&built.path);
    let hits = engine.search("hydrant", false);
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.layer == "assets"));
    assert!(hits.iter().all(|hit| hit.snippet.contains("[hydrant]")));

    let mut ids: Vec<FeatureId> = hits.iter().map(|hit| hit.feature_id).collect();
    ids.sort();
    assert_eq!(ids, vec![FeatureId(1), FeatureId(3)]);

    assert!(engine.search("", false).is_empty());
    assert!(engine.search("pressure", false).is_empty());

    let roads = engine.search("harbour", false);
    assert_eq!(roads.len(), 1);
    assert_eq!(roads[0].layer, "roads");
    assert_eq!(roads[0].feature_id, FeatureId(7));
}

#[test]
fn test_rebuild_is_idempotent() {
    let layers_dir = create_layers();
    let index_dir = TempDir::new().unwrap();
    let layers = load_layers(&layers_dir);

    let builder = IndexBuilder::new(index_dir.path(), project().index_config().unwrap(), layers);
    let first = builder.build(&CancellationToken::new()).unwrap();
    let first_hits = QueryEngine::new(&first.path).search("main", true);

    let second = builder.build(&CancellationToken::new()).unwrap();
    let second_hits = QueryEngine::new(&second.path).search("main", true);

    assert_eq!(first.record_count, second.record_count);
    assert_eq!(first_hits, second_hits);
    assert_eq!(second_hits.len(), 2);
}

#[test]
fn test_query_against_missing_index() {
    let index_dir = TempDir::new().unwrap();
    let engine = QueryEngine::new(index_dir.path().join("index.db"));
    assert!(engine.search("hydrant", true).is_empty());
}

#[derive(Default)]
struct NullNavigator {
    jumps: Mutex<Vec<(String, Vec<FeatureId>)>>,
}

impl MapNavigator for NullNavigator {
    fn show_map(&self) {}

    fn zoom_to_features(&self, layer: &str, ids: &[FeatureId]) {
        self.jumps
            .lock()
            .unwrap()
            .push((layer.to_string(), ids.to_vec()));
    }

    fn selection_changed(&self, _selection: &Selection) {}
}

#[derive(Default)]
struct StatusPanel {
    statuses: Mutex<Vec<String>>,
    enabled: Mutex<Option<bool>>,
}

impl SearchPanel for StatusPanel {
    fn set_search_enabled(&self, enabled: bool) {
        *self.enabled.lock().unwrap() = Some(enabled);
    }

    fn set_search_visible(&self, _visible: bool) {}

    fn show_entries(&self, entries: &[ResultEntry], _enabled: bool) {
        let mut statuses = self.statuses.lock().unwrap();
        statuses.extend(entries.iter().filter(|e| e.hit().is_none()).map(ResultEntry::display_text));
    }

    fn raise_message(&self, _title: &str, _message: &str, _level: MessageLevel) {}
}

#[tokio::test]
async fn test_session_lifecycle() {
    let layers_dir = create_layers();
    let storage = TempDir::new().unwrap();
    let navigator = Arc::new(NullNavigator::default());
    let panel = Arc::new(StatusPanel::default());

    let session = SearchSession::new(
        load_layers(&layers_dir),
        navigator.clone(),
        panel.clone(),
        storage.path(),
    );
    session.project_loaded(project()).unwrap();
    let path = session.wait_for_index().await.unwrap();
    assert!(path.starts_with(storage.path()));
    assert_eq!(session.build_status(), BuildStatus::Ready(path));
    assert_eq!(*panel.enabled.lock().unwrap(), Some(true));
    assert_eq!(panel.statuses.lock().unwrap()[0], UiText::BUILDING);

    let entries = session.search("harbour");
    assert_eq!(entries.len(), 1);
    assert!(session.jump_to(&entries[0]));
    assert_eq!(
        *navigator.jumps.lock().unwrap(),
        vec![("roads".to_string(), vec![FeatureId(7)])]
    );

    session.project_teardown();
    assert_eq!(session.build_status(), BuildStatus::Idle);
}
