//! Bracket server.
//!
//! Serves the bracket engine over HTTP, storing matches in memory or in
//! PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use be_server::{
    api,
    config::{ConfigOverrides, ServerConfig, StorageBackend},
    logging,
};
use bracket_engine::{
    BracketManager,
    db::{Database, InMemoryMatchRepository, MatchRepository, PgMatchRepository},
};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use sqlx::PgPool;

const HELP: &str = "\
Run a single-elimination bracket server

USAGE:
  be_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --storage    BACKEND     memory or postgres          [default: env STORAGE_BACKEND or memory]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --slots      N           Bracket slot count          [default: env BRACKET_SLOT_COUNT or 32]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE_BACKEND          memory | postgres
  DATABASE_URL             PostgreSQL connection string
  BRACKET_SLOT_COUNT       Power of two, at least 2
  BRACKET_SHUFFLE_ENTRANTS Shuffle entrants before seeding (true/false)
  RUST_LOG                 Log filter (default: info,sqlx=warn,hyper=warn)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = ConfigOverrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str::<_, StorageBackend>("--storage")?,
        slot_count: pargs.opt_value_from_str("--slots")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    info!(
        "Starting bracket server at {} ({} storage, {} slots)",
        config.bind, config.storage, config.bracket.slot_count
    );

    let (repo, pool) = open_storage(&config).await?;
    let bracket_manager = Arc::new(BracketManager::new(repo, config.bracket.clone())?);

    match bracket_manager.load_bracket().await {
        Ok(bracket_engine::BracketState::Ready(bracket)) => {
            info!("Loaded bracket with {} matches", bracket.matches().len())
        }
        Ok(bracket_engine::BracketState::NeedsSetup { reason }) => {
            info!("No bracket loaded ({}); waiting for generation", reason)
        }
        Err(e) => log::error!("Failed to load bracket: {}", e),
    }

    let app = api::create_router(api::AppState {
        bracket_manager,
        pool,
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Build the match repository for the configured backend
async fn open_storage(
    config: &ServerConfig,
) -> Result<(Arc<dyn MatchRepository>, Option<Arc<PgPool>>), Error> {
    match config.storage {
        StorageBackend::Memory => Ok((Arc::new(InMemoryMatchRepository::new()), None)),
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .context("Failed to connect to database")?;

            let repo = PgMatchRepository::new(db.pool().clone());
            repo.ensure_schema()
                .await
                .context("Failed to create bracket_matches table")?;
            info!("Database connected successfully");

            Ok((Arc::new(repo), Some(Arc::new(db.pool().clone()))))
        }
    }
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {}", e);
    }
}
