//! codeseeker binary — thin CLI shell over the [`codeseeker`] library crate.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{error, info};

use codeseeker::config::Config;
use codeseeker::embedding::ModelPreset;
use codeseeker::jobs::CancellationToken;
use codeseeker::mcp::run_mcp;
use codeseeker::state::AppState;

/// Local hybrid code-intelligence service — MCP stdio server for AI coding agents.
#[derive(Parser)]
#[command(name = "codeseeker", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Project root to index on startup before serving (default: none)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Embedding model preset: minilm (default) or bge-small
    #[arg(long)]
    embedding_model: Option<String>,

    /// Block startup until the initial index of --root completes
    #[arg(long)]
    wait_index: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project once and exit, without starting the MCP server
    Index {
        /// Project path
        path: PathBuf,
        /// Friendly project name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List indexed projects and their status
    Projects,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codeseeker=info".parse().unwrap()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "codeseeker", &mut std::io::stdout());
        return;
    }

    let project_root_for_config = cli.root.clone().unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let config = Config::load(&project_root_for_config).unwrap_or_else(|e| {
        error!(error = %e.actionable(), "failed to load configuration");
        std::process::exit(1);
    });

    let embedding_model = cli
        .embedding_model
        .as_deref()
        .and_then(ModelPreset::parse)
        .unwrap_or(config.embedding_model);

    let state = Arc::new(AppState::new(config.data_dir.clone(), embedding_model).unwrap_or_else(|e| {
        error!(error = %e.actionable(), "failed to initialize application state");
        std::process::exit(1);
    }));

    match &cli.command {
        Some(Commands::Index { path, name }) => {
            run_index_once(&state, path, name.as_deref());
            return;
        }
        Some(Commands::Projects) => {
            for p in state.projects.list() {
                println!("{}\t{}\t{}", p.id, p.name, p.absolute_path);
            }
            return;
        }
        Some(Commands::Completions { .. }) => unreachable!("handled above"),
        None => {}
    }

    if let Some(root) = &cli.root {
        if cli.wait_index {
            run_index_once(&state, root, None);
        } else {
            let state_bg = state.clone();
            let root = root.clone();
            std::thread::spawn(move || run_index_once(&state_bg, &root, None));
        }
    }

    info!(projects = state.projects.list().len(), data_dir = %state.data_dir.display(), "starting MCP stdio server");
    run_mcp(state);
}

fn run_index_once(state: &Arc<AppState>, path: &PathBuf, name: Option<&str>) {
    let canonical = path.canonicalize().unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "project path not found");
        std::process::exit(1);
    });
    let project = match state.projects.get_or_create(&canonical.to_string_lossy(), name) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e.actionable(), "failed to register project");
            std::process::exit(1);
        }
    };

    let token = CancellationToken::new();
    let start = std::time::Instant::now();
    match state.indexing.index_project(&canonical, &project.id, &[], &token, None) {
        Ok(result) => {
            state.query_cache.invalidate_project(&project.id);
            info!(
                project = project.name.as_str(),
                files = result.files_processed,
                chunks = result.chunks_created,
                nodes = result.nodes_created,
                edges = result.edges_created,
                time_ms = start.elapsed().as_millis() as u64,
                "indexing complete"
            );
        }
        Err(e) => {
            error!(error = %e.actionable(), "indexing failed");
            std::process::exit(1);
        }
    }
}
