//! # Tasklane API Server
//!
//! Multi-tenant task manager API: workspaces, projects, sections and tasks
//! behind JWT authentication and per-workspace role checks.
//!
//! ## Storage
//!
//! With `DATABASE_URL` set the server runs on PostgreSQL, creating the
//! database and applying migrations on startup. Without it the server runs
//! on the in-memory store, which is handy for local development and demos
//! but loses everything on restart.
//!
//! ## Usage
//!
//! ```bash
//! JWT_ACCESS_SECRET=... JWT_REFRESH_SECRET=... cargo run -p tasklane-api
//! ```

use std::sync::Arc;

use tasklane_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasklane_shared::{
    auth::session::spawn_session_sweeper,
    db::{
        migrations::{ensure_database_exists, run_migrations},
        pool::{self, create_pool},
    },
    store::{MemoryStore, PgStore, Store},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SESSION_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

const DEFAULT_LOG_FILTER: &str = "tasklane_api=debug,tasklane_shared=info,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    let Some(database) = &config.database else {
        tracing::warn!("DATABASE_URL not set; using the in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    };

    ensure_database_exists(&database.url).await?;

    let db_config = pool::DatabaseConfig {
        max_connections: database.max_connections,
        ..pool::DatabaseConfig::new(database.url.clone())
    };
    let pool = create_pool(db_config).await?;
    run_migrations(&pool).await?;

    let stats = pool::pool_stats(&pool);
    tracing::info!(
        connections = stats.total_connections,
        idle = stats.idle_connections,
        "Connected to PostgreSQL"
    );

    Ok(Arc::new(PgStore::new(pool)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "Tasklane API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    tracing::debug!(
        cors_origins = ?config.api.cors_origins,
        production = config.api.production,
        postgres = config.database.is_some(),
        jwt = ?config.jwt,
        "Configuration loaded"
    );

    let store = open_store(&config).await?;
    let sweeper = spawn_session_sweeper(store.clone(), SESSION_SWEEP_INTERVAL);
    let address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}
