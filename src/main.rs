use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use griptape_docs_mcp::config::Config;
use griptape_docs_mcp::db::DocStore;
use griptape_docs_mcp::ingest::{BuildOptions, build_store};
use griptape_docs_mcp::mcp::server::{McpContext, McpServer};
use griptape_docs_mcp::service::QueryService;
use griptape_docs_mcp::validate::{Thresholds, validate_store};

#[derive(Parser, Debug)]
#[command(name = "griptape-docs-mcp", version, about = "Griptape documentation MCP server")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Documentation store (overrides GRIPTAPE_MCP_DB_PATH and the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the MCP tools on stdio (default)
    Serve,
    /// Check a built store and print PASS/FAIL per check
    Validate {
        /// Only require non-empty counts instead of full-build minimums
        #[arg(long)]
        lenient: bool,
    },
    /// Build a fresh store from local markdown directories
    Build {
        /// Griptape Framework docs directory
        #[arg(long)]
        framework_dir: Option<PathBuf>,
        /// Griptape Nodes docs directory
        #[arg(long)]
        nodes_dir: Option<PathBuf>,
        /// Output store file (replaced if it exists)
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    // stdout carries the MCP protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("griptape-docs-mcp: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    config.validate().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let db_path = config.resolve_db_path(cli.db.as_deref(), |k| std::env::var(k).ok())?;
            serve(config, db_path)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate { lenient } => {
            let db_path = config.resolve_db_path(cli.db.as_deref(), |k| std::env::var(k).ok())?;
            let limits = if lenient {
                Thresholds::non_empty()
            } else {
                Thresholds::default()
            };
            println!("Validating: {}\n", db_path.display());
            let report = validate_store(&db_path, &limits);
            println!("{report}");
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Build {
            framework_dir,
            nodes_dir,
            output,
        } => {
            let stats = build_store(&BuildOptions {
                framework_dir,
                nodes_dir,
                output,
            })?;
            println!(
                "pages={} sections={} code_examples={} nodes={} skipped={}",
                stats.pages, stats.sections, stats.code_examples, stats.nodes, stats.skipped
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn serve(config: Config, db_path: PathBuf) -> Result<()> {
    info!("Starting griptape-docs-mcp {}", env!("CARGO_PKG_VERSION"));

    // 1. Open the store (read-only, verified)
    let store = DocStore::open(&db_path)
        .with_context(|| format!("cannot serve from {}", db_path.display()))?;

    // 2. Build the query service
    let service = QueryService::new(Arc::new(store), config.search);

    // 3. Serve on stdio until the client disconnects
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(McpServer::new(McpContext {
        service: Arc::new(service),
    })
    .start())
}
