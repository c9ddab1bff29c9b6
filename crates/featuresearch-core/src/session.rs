//! Search session: ties one project's index lifecycle to a search panel.
//!
//! The session reacts to host events (project loaded, rebuild requested,
//! project closed), runs builds in the background, and turns queries into
//! result entries for the panel.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::config::UiText;
use crate::index::{BuiltIndex, IndexBuildTask, IndexBuilder, QueryEngine};
use crate::layers::{LayerSource, MapNavigator};
use crate::paths;
use crate::resolver::{ResultEntry, ResultResolver};
use crate::settings::Project;
use crate::{Result, SearchError};

/// Severity of a message raised on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Warning,
    Critical,
}

/// The search UI as seen by the session.
pub trait SearchPanel: Send + Sync {
    /// Enable or disable the search text box.
    fn set_search_enabled(&self, enabled: bool);

    /// Show or hide the search text box.
    fn set_search_visible(&self, visible: bool);

    /// Replace the results list. `enabled` is false for status-only lists.
    fn show_entries(&self, entries: &[ResultEntry], enabled: bool);

    /// Raise a user-facing message.
    fn raise_message(&self, title: &str, message: &str, level: MessageLevel);
}

/// State of the session's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No project, or the project was closed.
    Idle,
    Building,
    /// The index at this path is ready to query.
    Ready(PathBuf),
    /// The project's search configuration was rejected.
    InvalidConfig(String),
    Failed(String),
}

impl BuildStatus {
    pub fn is_building(&self) -> bool {
        matches!(self, BuildStatus::Building)
    }
}

#[derive(Default)]
struct SessionState {
    project: Option<Project>,
    engine: Option<QueryEngine>,
    fuzzy: bool,
    last_text: String,
    /// Bumped on every rebuild and teardown; completions from older builds
    /// are ignored.
    generation: u64,
    build_cancel: Option<CancellationToken>,
    /// Monitor of the latest build. The next build waits for it, since all
    /// builds of a project write the same artifact.
    build_monitor: Option<JoinHandle<()>>,
}

struct SessionInner {
    layers: Arc<dyn LayerSource>,
    resolver: ResultResolver,
    panel: Arc<dyn SearchPanel>,
    storage_root: PathBuf,
    state: Mutex<SessionState>,
    status: watch::Sender<BuildStatus>,
}

/// One search session per host application.
///
/// Methods that start a build must be called from within a tokio runtime.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

impl SearchSession {
    pub fn new(
        layers: Arc<dyn LayerSource>,
        navigator: Arc<dyn MapNavigator>,
        panel: Arc<dyn SearchPanel>,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        let (status, _) = watch::channel(BuildStatus::Idle);
        Self {
            inner: Arc::new(SessionInner {
                resolver: ResultResolver::new(layers.clone(), navigator),
                layers,
                panel,
                storage_root: storage_root.into(),
                state: Mutex::new(SessionState::default()),
                status,
            }),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.inner.storage_root
    }

    /// A project was loaded: remember it and build its index.
    pub fn project_loaded(&self, project: Project) -> Result<()> {
        info!("Project loaded: {}", project.name);
        self.inner.lock_state().project = Some(project);
        self.rebuild_index()
    }

    /// Rebuild the index of the current project.
    ///
    /// Any build already running is cancelled, and the new one starts only
    /// after it has stopped. Returns once the new build has been scheduled;
    /// use [`wait_for_index`](Self::wait_for_index) for its outcome.
    pub fn rebuild_index(&self) -> Result<()> {
        let inner = &self.inner;
        let (project, generation) = {
            let mut state = inner.lock_state();
            let project = state.project.clone().ok_or_else(|| SearchError::Config {
                message: "no project is loaded".to_string(),
            })?;
            if let Some(previous) = state.build_cancel.take() {
                debug!("Cancelling previous index build");
                previous.cancel();
            }
            state.generation += 1;
            (project, state.generation)
        };

        inner.panel.set_search_enabled(false);
        inner
            .panel
            .show_entries(&[ResultEntry::status(UiText::BUILDING)], false);

        let config = match project.index_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid search config for project {}: {}", project.name, e);
                inner.lock_state().engine = None;
                inner.panel.raise_message(
                    UiText::MESSAGE_TITLE,
                    UiText::INVALID_CONFIG_MESSAGE,
                    MessageLevel::Warning,
                );
                inner.panel.set_search_visible(false);
                inner
                    .panel
                    .show_entries(&[ResultEntry::status(UiText::INVALID_CONFIG_STATUS)], false);
                inner
                    .status
                    .send_replace(BuildStatus::InvalidConfig(e.to_string()));
                return Err(e);
            }
        };
        inner.panel.set_search_visible(true);

        let index_dir = paths::index_dir(&inner.storage_root, &project.name);
        let builder = IndexBuilder::new(index_dir, config, inner.layers.clone());
        inner.status.send_replace(BuildStatus::Building);

        let cancel = CancellationToken::new();
        let monitor = Arc::clone(inner);
        let mut state = inner.lock_state();
        let previous = state.build_monitor.take();
        state.build_cancel = Some(cancel.clone());
        state.build_monitor = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                debug!("Waiting for previous index build to stop");
                if let Err(e) = previous.await {
                    warn!("Previous index build monitor failed: {}", e);
                }
            }
            let result = IndexBuildTask::start_with_token(builder, cancel).wait().await;
            monitor.finish_build(generation, result);
        }));
        Ok(())
    }

    /// The project is closing: stop any build and forget its index.
    pub fn project_teardown(&self) {
        let mut state = self.inner.lock_state();
        if let Some(cancel) = state.build_cancel.take() {
            cancel.cancel();
        }
        state.generation += 1;
        state.project = None;
        state.engine = None;
        state.last_text.clear();
        drop(state);

        self.inner.status.send_replace(BuildStatus::Idle);
        info!("Search session torn down");
    }

    /// Run a query and show its results.
    ///
    /// Empty text clears the list. Non-empty text with no hits shows a
    /// single disabled "No Results" entry.
    pub fn search(&self, text: &str) -> Vec<ResultEntry> {
        let (engine, fuzzy) = {
            let mut state = self.inner.lock_state();
            state.last_text = text.to_string();
            (state.engine.clone(), state.fuzzy)
        };

        if text.trim().is_empty() {
            self.inner.panel.show_entries(&[], false);
            return Vec::new();
        }

        let hits = engine
            .map(|engine| engine.search(text, fuzzy))
            .unwrap_or_default();

        if hits.is_empty() {
            let entries = vec![ResultEntry::status(UiText::NO_RESULTS)];
            self.inner.panel.show_entries(&entries, false);
            return entries;
        }

        let entries: Vec<ResultEntry> = hits.into_iter().map(ResultEntry::from).collect();
        self.inner.panel.show_entries(&entries, true);
        entries
    }

    /// Toggle prefix matching and re-run the last query.
    pub fn set_fuzzy(&self, fuzzy: bool) -> Vec<ResultEntry> {
        let text = {
            let mut state = self.inner.lock_state();
            state.fuzzy = fuzzy;
            state.last_text.clone()
        };
        self.search(&text)
    }

    pub fn is_fuzzy(&self) -> bool {
        self.inner.lock_state().fuzzy
    }

    /// Navigate to a result. Returns false for status entries and results
    /// that no longer resolve.
    pub fn jump_to(&self, entry: &ResultEntry) -> bool {
        self.inner.resolver.jump_to(entry)
    }

    pub fn build_status(&self) -> BuildStatus {
        self.inner.status.borrow().clone()
    }

    /// Path of the index queries currently go to.
    pub fn active_index_path(&self) -> Option<PathBuf> {
        self.inner
            .lock_state()
            .engine
            .as_ref()
            .map(|engine| engine.db_path().to_path_buf())
    }

    /// Wait until no build is running and report the index state.
    pub async fn wait_for_index(&self) -> Result<PathBuf> {
        let mut rx = self.inner.status.subscribe();
        let status = rx
            .wait_for(|status| !status.is_building())
            .await
            .map_err(|e| SearchError::Other(e.to_string()))?
            .clone();

        match status {
            BuildStatus::Ready(path) => Ok(path),
            BuildStatus::InvalidConfig(message) => Err(SearchError::Config { message }),
            BuildStatus::Failed(message) => Err(SearchError::BuildFailed { message }),
            BuildStatus::Idle => Err(SearchError::IndexNotBuilt { path: None }),
            BuildStatus::Building => Err(SearchError::Other("build still running".to_string())),
        }
    }
}

impl SessionInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish_build(&self, generation: u64, result: Result<BuiltIndex>) {
        let mut state = self.lock_state();
        if state.generation != generation {
            debug!("Ignoring outcome of superseded index build");
            return;
        }
        state.build_cancel = None;

        match result {
            Ok(built) => {
                state.engine = Some(QueryEngine::new(&built.path));
                drop(state);

                info!("Index built in: {:.3} seconds", built.elapsed_secs());
                self.panel.show_entries(&[], false);
                self.panel.set_search_enabled(true);
                self.status.send_replace(BuildStatus::Ready(built.path));
            }
            Err(e) => {
                drop(state);
                error!("Search index build failed: {}", e);
                self.panel.raise_message(
                    UiText::MESSAGE_TITLE,
                    UiText::BUILD_FAILED,
                    MessageLevel::Critical,
                );
                self.panel
                    .show_entries(&[ResultEntry::status(UiText::BUILD_FAILED)], false);
                self.status.send_replace(BuildStatus::Failed(e.to_string()));
            }
        }
    }
}
