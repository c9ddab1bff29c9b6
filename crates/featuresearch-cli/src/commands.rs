//! Subcommand implementations.

use crate::console::{ConsoleNavigator, ConsolePanel};
use anyhow::{bail, Context, Result};
use featuresearch::{
    paths, FeatureId, GeoJsonLayerSource, IndexBuildTask, IndexBuilder, LayerSource, Project,
    QueryEngine, ResultEntry, ResultResolver, SearchHit, SearchSession, UiText,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

fn load_layers(dir: &Path) -> Result<Arc<dyn LayerSource>> {
    let source = GeoJsonLayerSource::from_dir(dir)
        .with_context(|| format!("Failed to load layers from {}", dir.display()))?;
    Ok(Arc::new(source))
}

fn load_project(path: &Path) -> Result<Project> {
    Project::load(path).with_context(|| format!("Failed to load project {}", path.display()))
}

fn project_db_path(storage_root: &Path, project: &Project) -> PathBuf {
    paths::index_db_path(&paths::index_dir(storage_root, &project.name))
}

pub async fn build(storage_root: &Path, project_path: &Path, layers_dir: &Path) -> Result<()> {
    let project = load_project(project_path)?;
    let config = project
        .index_config()
        .context(UiText::INVALID_CONFIG_STATUS)?;
    let layers = load_layers(layers_dir)?;

    let index_dir = paths::index_dir(storage_root, &project.name);
    let task = IndexBuildTask::start(IndexBuilder::new(index_dir, config, layers));

    // Ctrl-C cancels the build
    let cancel = task.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling index build");
            cancel.cancel();
        }
    });

    let result = task.wait().await;
    interrupt.abort();
    let built = match result {
        Err(e) if e.is_cancelled() => bail!("Index build cancelled"),
        result => result.context(UiText::BUILD_FAILED)?,
    };

    println!("{}", built.path.display());
    println!(
        "{} records in {:.3} seconds",
        built.record_count,
        built.elapsed_secs()
    );
    Ok(())
}

pub fn search(
    storage_root: &Path,
    project_path: &Path,
    text: &str,
    fuzzy: bool,
    json: bool,
) -> Result<()> {
    let project = load_project(project_path)?;
    let engine = QueryEngine::new(project_db_path(storage_root, &project));
    let hits = engine
        .try_search(text, fuzzy)
        .with_context(|| format!("Search failed for project '{}'", project.name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("{}", UiText::NO_RESULTS);
    } else {
        for (number, hit) in hits.iter().enumerate() {
            println!("{:>3}. {}", number + 1, hit.display_text());
        }
    }
    Ok(())
}

pub fn info(storage_root: &Path, project_path: &Path) -> Result<()> {
    let project = load_project(project_path)?;
    let engine = QueryEngine::new(project_db_path(storage_root, &project));
    let stats = engine
        .stats()
        .with_context(|| format!("No usable index for project '{}'", project.name))?;

    println!("index:   {}", engine.db_path().display());
    println!("records: {}", stats.record_count);
    println!("fields:  {}", stats.fields.join(", "));
    Ok(())
}

pub fn resolve(layers_dir: &Path, layer: &str, feature_id: i64) -> Result<()> {
    let resolver = ResultResolver::new(load_layers(layers_dir)?, Arc::new(ConsoleNavigator));
    let entry = ResultEntry::Hit(SearchHit {
        layer: layer.to_string(),
        feature_id: FeatureId(feature_id),
        snippet: String::new(),
    });

    if !resolver.jump_to(&entry) {
        bail!("Feature {} not found on layer '{}'", feature_id, layer);
    }
    Ok(())
}

/// One line of shell input.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput {
    Query(String),
    Fuzzy(bool),
    Jump(usize),
    Rebuild,
    Quit,
    Unknown(String),
}

impl ShellInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return ShellInput::Query(line.to_string());
        };

        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("q" | "quit"), None) => ShellInput::Quit,
            (Some("rebuild"), None) => ShellInput::Rebuild,
            (Some("fuzzy"), Some("on")) => ShellInput::Fuzzy(true),
            (Some("fuzzy"), Some("off")) => ShellInput::Fuzzy(false),
            (Some("jump"), Some(n)) => match n.parse() {
                Ok(number) => ShellInput::Jump(number),
                Err(_) => ShellInput::Unknown(line.to_string()),
            },
            _ => ShellInput::Unknown(line.to_string()),
        }
    }
}

const SHELL_HELP: &str =
    "Type a query, or :fuzzy on|off, :jump N, :rebuild, :quit";

pub async fn shell(storage_root: &Path, project_path: &Path, layers_dir: &Path) -> Result<()> {
    let project = load_project(project_path)?;
    let panel = Arc::new(ConsolePanel::default());
    let session = SearchSession::new(
        load_layers(layers_dir)?,
        Arc::new(ConsoleNavigator),
        panel.clone(),
        storage_root,
    );

    // An invalid config has already been reported through the panel
    if let Err(e) = session.project_loaded(project) {
        warn!("Index not built: {}", e);
    }
    println!("{}", SHELL_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ShellInput::parse(&line) {
                    ShellInput::Query(text) => {
                        session.search(&text);
                    }
                    ShellInput::Fuzzy(fuzzy) => {
                        session.set_fuzzy(fuzzy);
                    }
                    ShellInput::Jump(number) => match panel.entry(number) {
                        Some(entry) => {
                            if !session.jump_to(&entry) {
                                println!("(result {} cannot be shown)", number);
                            }
                        }
                        None => println!("(no result {})", number),
                    },
                    ShellInput::Rebuild => {
                        if let Err(e) = session.rebuild_index() {
                            warn!("Rebuild not started: {}", e);
                        }
                    }
                    ShellInput::Quit => break,
                    ShellInput::Unknown(input) => println!("Unknown command {}. {}", input, SHELL_HELP),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.project_teardown();
    Ok(())
}
