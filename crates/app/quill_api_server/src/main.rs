//! Quill API server binary.
//!
//! Connects to PostgreSQL (and Redis when configured), runs migrations, and
//! serves the REST API until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use quill_core::articles::PgArticleStore;
use quill_core::kv::{KeyValueStore, MemoryStore, RedisStore};
use quill_core::users::PgUserStore;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info, warn};

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "quill_api_server", about = "Quill API server")]
struct Args {
    /// Address to bind.
    #[arg(long, env = "BIND_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3100)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/quill"
    )]
    database_url: String,

    /// Redis URL for refresh tokens and the article cache.
    ///
    /// Without it both live in process memory: tokens do not survive a
    /// restart and multiple instances do not share state.
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Per-request deadline in seconds.
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,quill_api=debug,quill_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    info!(port = args.port, "starting quill_api_server");
    info!(max_connections = args.max_connections, "configuring connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    quill_api::migrate(&pool).await?;

    let kv: Arc<dyn KeyValueStore> = match &args.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url)?;
            store.ping().await?;
            info!("connected to redis");
            Arc::new(store)
        }
        None => {
            warn!("REDIS_URL not set; refresh tokens and article cache are process-local");
            let store = MemoryStore::new();
            spawn_expiry_sweeper(store.clone());
            Arc::new(store)
        }
    };

    let mut config = quill_api::config::ApiConfig::from_env();
    config.bind_addr = format!("{}:{}", args.host, args.port);
    config.database_url = args.database_url;
    config.redis_url = args.redis_url;
    config.request_timeout = Duration::from_secs(args.request_timeout_secs);

    let state = quill_api::AppState::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgArticleStore::new(pool.clone())),
        kv,
        config.clone(),
    );
    let app = quill_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("server stopped");
    Ok(())
}

/// Periodically drop expired entries from the in-process store.
fn spawn_expiry_sweeper(store: MemoryStore) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                debug!(removed, "expired in-memory entries dropped");
            }
        }
    });
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
