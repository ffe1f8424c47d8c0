//! Conflux Entry Point
//!
//! Builds the database registry from repeated `--db-path` / `--db-name` /
//! `--db-desc` triples and starts the MCP server on stdio. Stdout carries
//! the protocol; all logging goes to stderr.
//!
//! Registry construction failures (missing file, duplicate key, no
//! databases) are fatal: they are reported on stderr and the process exits
//! non-zero before the server loop starts.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use conflux::driver::sqlite::FileDriver;
use conflux::mcp::McpServer;
use conflux::registry::Registry;

/// Conflux - Cross-Database SQL Access Server
#[derive(Parser)]
#[command(name = "conflux")]
#[command(about = "Cross-database SQL access server for file-based databases")]
#[command(version)]
struct Cli {
    /// Path to a database file. Repeat for multiple databases; the first
    /// one becomes the default (primary) database.
    #[arg(long = "db-path", value_name = "PATH", required = true)]
    db_paths: Vec<PathBuf>,

    /// Short name for the database at the same position as its --db-path
    #[arg(long = "db-name", value_name = "NAME")]
    db_names: Vec<String>,

    /// Description for the database at the same position as its --db-path
    #[arg(long = "db-desc", value_name = "TEXT")]
    db_descs: Vec<String>,
}

fn build_registry(cli: &Cli) -> conflux::Result<Registry> {
    let mut registry = Registry::new();
    for (i, path) in cli.db_paths.iter().enumerate() {
        let name = cli.db_names.get(i).cloned();
        let description = cli.db_descs.get(i).cloned();
        let entry = registry.register(path, name, description)?;
        tracing::info!(key = %entry.key, path = %entry.path.display(), "registered database");
    }
    Ok(registry)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let registry = match build_registry(&cli) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e.message());
            return ExitCode::FAILURE;
        }
    };

    if let Some(primary) = registry.primary_key() {
        tracing::info!(primary, databases = registry.len(), "registry ready");
    }

    let server = McpServer::new(registry, Box::new(FileDriver));
    if let Err(e) = server.serve().await {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
