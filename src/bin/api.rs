//! McLaren API server binary.
//!
//! This is the composition root: it resolves configuration, selects the
//! storage backend once, migrates it and hands the assembled state to the
//! API server. Nothing below this point re-reads the environment.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use mclaren_api::api::{self, AppState, Config, VersionError};
use mclaren_api::config::{self, ConfigError, DEFAULT_SETTINGS_PATH, Environment, Settings};
use mclaren_api::db::{DbError, Storage};
use mclaren_api::logging::{self, LogService};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
enum BinaryError {
    #[error("Configuration error: {0}")]
    #[diagnostic(code(mclaren::binary::config))]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    #[diagnostic(code(mclaren::binary::database))]
    Database(#[from] DbError),

    #[error("Controller versioning error: {0}")]
    #[diagnostic(code(mclaren::binary::versioning))]
    Versioning(#[from] VersionError),

    #[error("API server error: {0}")]
    #[diagnostic(code(mclaren::binary::io))]
    Io(#[from] std::io::Error),
}

#[derive(Parser)]
#[command(name = "mclaren-api")]
#[command(author, version, about = "McLaren races, cars and drivers API", long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Redirect plain HTTP requests to HTTPS on this port
    #[arg(long, env = "MCLAREN_HTTPS_PORT")]
    https_port: Option<u16>,

    /// Deployment environment (Production selects the cloud database)
    #[arg(long, env = config::ENVIRONMENT_VAR)]
    environment: Option<String>,

    /// Settings file (defaults to config/settings.yaml when present)
    #[arg(long, env = "MCLAREN_CONFIG")]
    config: Option<PathBuf>,

    /// Embedded database connection string, overriding the settings file
    #[arg(long, env = "MCLAREN_SQLITE_CONNECTION")]
    sqlite_connection: Option<String>,

    /// Cloud database connection string, overriding the settings file
    #[arg(long, env = "MCLAREN_CLOUD_SQL_CONNECTION")]
    cloud_connection: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), BinaryError> {
    let cli = Cli::parse();

    logging::init_tracing();
    let log = LogService::global();

    let environment = Environment::from_flag(cli.environment.as_deref());
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::from_file_or_default(Path::new(DEFAULT_SETTINGS_PATH))?,
    }
    .with_overrides(cli.sqlite_connection, cli.cloud_connection);

    // Selected once; immutable for the life of the process.
    let storage_config = config::select(&environment, &settings.connection_strings)?;
    log.info("environment", &format!("Environment: {}", environment));
    log.storage_selected(&storage_config);

    let storage = Storage::connect(&storage_config).await?;
    storage.migrate().await?;
    log.info("migrations", "Database migrations complete");

    let state = AppState::new(storage, log, environment, api::version_map()?)
        .with_https_port(cli.https_port);

    api::run(
        Config {
            host: cli.host,
            port: cli.port,
        },
        state,
    )
    .await?;

    Ok(())
}
