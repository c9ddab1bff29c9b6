//! featuresearch CLI - build and query layer attribute indexes from the shell.
//!
//! Layers are read from a directory of GeoJSON files; the search
//! configuration comes from a project file (`{"name": ..., "settings":
//! {"search": {...}}}`).

mod commands;
mod console;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "featuresearch")]
#[command(about = "Full-text search over map layer attributes")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Root directory for index artifacts (defaults to the user data dir)
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build (or rebuild) the search index of a project
    Build {
        /// Project file
        #[arg(long)]
        project: PathBuf,

        /// Directory of GeoJSON layers
        #[arg(long)]
        layers: PathBuf,
    },

    /// Query a built index
    Search {
        #[arg(long)]
        project: PathBuf,

        /// Match every word as a prefix
        #[arg(long)]
        fuzzy: bool,

        /// Print hits as JSON
        #[arg(long)]
        json: bool,

        /// Query text
        text: String,
    },

    /// Show record count and indexed fields of a built index
    Info {
        #[arg(long)]
        project: PathBuf,
    },

    /// Zoom to and select one feature
    Resolve {
        #[arg(long)]
        layers: PathBuf,

        /// Layer name
        #[arg(long)]
        layer: String,

        /// Feature id within the layer
        #[arg(long)]
        feature_id: i64,
    },

    /// Interactive search prompt with background index builds
    Shell {
        #[arg(long)]
        project: PathBuf,

        #[arg(long)]
        layers: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG takes precedence over --debug
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let storage_root = match args.storage_root {
        Some(path) => path,
        None => featuresearch::paths::default_storage_root()?,
    };
    debug!("Storage root: {}", storage_root.display());

    match args.command {
        Command::Build { project, layers } => {
            commands::build(&storage_root, &project, &layers).await
        }
        Command::Search {
            project,
            fuzzy,
            json,
            text,
        } => commands::search(&storage_root, &project, &text, fuzzy, json),
        Command::Info { project } => commands::info(&storage_root, &project),
        Command::Resolve {
            layers,
            layer,
            feature_id,
        } => commands::resolve(&layers, &layer, feature_id),
        Command::Shell { project, layers } => {
            commands::shell(&storage_root, &project, &layers).await
        }
    }
}
