//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use crate::engine::EngineOptions;
use crate::http_server::HttpServer;
use crate::observability::{log_event, Event};
use crate::store::{DocumentStore, StoreConfig};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, db, listen } => serve(config.as_deref(), db, listen),
        Command::Shrink { db } => shrink(&db),
    }
}

/// Open the store and serve it over HTTP until Ctrl-C.
pub fn serve(config_path: Option<&Path>, db: Option<String>, listen: Option<String>) -> CliResult<()> {
    let config = Config::resolve(config_path, db, listen)?;
    log_event(
        Event::ConfigLoaded,
        &[
            ("db", &config.db),
            ("listen", &config.listen),
            (
                "source",
                &config_path
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "defaults".to_string()),
            ),
        ],
    );

    let http_config = config.http_config()?;
    let store = DocumentStore::open_with(config.store_config())?;
    let server = HttpServer::with_config(http_config, Arc::new(store));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Compact a database file offline.
pub fn shrink(db_path: &Path) -> CliResult<()> {
    if !db_path.is_file() {
        return Err(CliError::maintenance_failed(format!(
            "No database file at {}",
            db_path.display()
        )));
    }

    let connection = db_path.to_string_lossy().into_owned();
    let store = DocumentStore::open_with(StoreConfig {
        connection,
        engine: EngineOptions {
            auto_shrink_percentage: None,
            ..EngineOptions::default()
        },
    })
    .map_err(|e| CliError::maintenance_failed(e.to_string()))?;

    store
        .shrink()
        .and_then(|()| store.close())
        .map_err(|e| CliError::maintenance_failed(e.to_string()))
}
