//! Tiller auth API server binary.
//!
//! Serves the HTTP surface. Deployments that consume RPC over a message
//! broker wire `tiller_api::rpc::Dispatcher` to their broker client.

use std::time::Duration;

use clap::Parser;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, warn};

const DB_CONNECT_ATTEMPTS: u32 = 5;

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "tiller_server", about = "Tiller auth API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    bind: String,

    /// SQLite connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://tiller.db?mode=rwc"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tiller_api=debug,tiller_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(database_url = %args.database_url, addr = %args.bind, "starting tiller_server");

    let pool = connect_with_retry(&args.database_url, args.max_connections).await?;

    info!("running database migrations");
    tiller_api::migrate(&pool).await?;

    let mut config = tiller_api::config::ApiConfig::from_env();
    config.bind_addr = args.bind;
    config.database_url = args.database_url;

    let state = tiller_api::AppState::new(pool, config)?;

    // The role catalog must exist before the first registration.
    state.manager.ensure_permission_types_seeded().await?;

    let bind_addr = state.config.bind_addr.clone();
    let app = tiller_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect to the database, retrying a bounded number of times before
/// giving up.
async fn connect_with_retry(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let mut attempt = 1;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < DB_CONNECT_ATTEMPTS => {
                warn!(attempt, error = %e, "database connect failed, retrying");
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
