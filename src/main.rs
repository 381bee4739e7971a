mod config;
mod db;
mod error;
mod handlers;
mod maintenance;
mod models;
mod state;
mod votes;
mod words;

use axum::{
    Router,
    routing::{delete, get, put},
};
use config::Config;
use db::EventStore;
use maintenance::MaintenanceConfig;
use state::AppState;
use std::path::Path;
use tokio::sync::watch;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use words::Wordlist;

pub fn app(app_state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route(
            "/api/events",
            delete(handlers::purge_all_handler).post(handlers::create_event_handler),
        )
        .route(
            "/api/events/{id}",
            get(handlers::get_event_handler).delete(handlers::delete_event_handler),
        )
        .route("/api/events/{id}/votes", put(handlers::vote_handler))
        .fallback_service(ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        database_url = %config.database_url,
        bind_addr = %config.bind_addr,
        event_ttl_seconds = config.event_ttl_seconds,
        "configuration loaded"
    );

    let words = match &config.wordlist_path {
        Some(path) => Wordlist::from_file(path).await?,
        None => Wordlist::builtin(),
    };
    tracing::info!(words = words.len(), "word list loaded");

    let store = EventStore::open(&config.database_url, words, config.max_event_days).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let upkeep = maintenance::spawn(
        store.clone(),
        MaintenanceConfig {
            purge_interval: config.purge_interval,
            backup_interval: config.backup_interval,
            backup_path: config.backup_path.clone(),
        },
        shutdown_rx,
    );

    let app_state = AppState {
        store: store.clone(),
        event_ttl_seconds: config.event_ttl_seconds,
    };
    let app = app(app_state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    if let Err(e) = upkeep.await {
        tracing::error!(error = %e, "maintenance task panicked");
    }
    store.close().await;
    tracing::info!("database connection closed");
    Ok(())
}
