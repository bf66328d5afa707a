//! quarry CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use quarry::{
    commands::{
        cmd_index, cmd_init, cmd_retry, cmd_search, cmd_status, print_index_summary, print_init,
        print_search_results, print_status, resolve_target, SearchArgs,
    },
    config::Config,
    error::Result,
    federation::Scope,
    progress::LogWriterFactory,
    search::SearchMode,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(version, about = "Index source trees and search them with hybrid retrieval", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize quarry configuration and the stores directory
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Index a source tree into a project store
    Index {
        /// Root of the tree to index
        path: PathBuf,

        /// Store name (defaults to the directory name)
        #[arg(short, long)]
        project: Option<String>,

        /// Index into the shared global store
        #[arg(long, conflicts_with = "project")]
        global: bool,
    },

    /// Search indexed stores
    Search {
        /// The search query
        query: String,

        /// Scope: 'global', 'all', or a project name
        #[arg(short, long, default_value = "all")]
        scope: String,

        /// Mode: 'lexical', 'semantic', or 'hybrid'
        #[arg(short, long, default_value = "hybrid")]
        mode: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Only return hits whose path matches this glob
        #[arg(long)]
        path: Option<String>,
    },

    /// Retry previously failed paths
    Retry {
        /// Root of the tree the failed paths are relative to
        path: PathBuf,

        /// Store name (defaults to the directory name)
        #[arg(short, long)]
        project: Option<String>,

        /// Retry the shared global store
        #[arg(long, conflicts_with = "project")]
        global: bool,
    },

    /// Show stores, row counts, and pending retries
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // init and completions work without an existing config
    if let Commands::Init { force } = cli.command {
        let base_dir = cli.config.as_deref().and_then(|p| {
            if p.extension().map_or(false, |e| e == "toml") {
                p.parent().map(PathBuf::from)
            } else {
                Some(p.to_path_buf())
            }
        });
        let config = cmd_init(base_dir, force).await?;
        print_init(&config);
        return Ok(());
    }

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "quarry", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Index {
            path,
            project,
            global,
        } => {
            let store_name = resolve_target(&path, project.as_deref(), global)?;
            let summary = cmd_index(&config, &path, &store_name).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_index_summary(&summary, &store_name);
            }
        }

        Commands::Search {
            query,
            scope,
            mode,
            limit,
            path,
        } => {
            let args = SearchArgs {
                scope: scope.parse::<Scope>()?,
                mode: mode.parse::<SearchMode>()?,
                limit,
                path_filter: path,
            };
            let response = cmd_search(&config, &query, args).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_search_results(&response, &query);
            }
        }

        Commands::Retry {
            path,
            project,
            global,
        } => {
            let store_name = resolve_target(&path, project.as_deref(), global)?;
            let summary = cmd_retry(&config, &path, &store_name).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_index_summary(&summary, &store_name);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'quarry init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
