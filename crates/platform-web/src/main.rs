use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use platform_web::app::build_router;
use platform_web::auth::HttpAuthClient;
use platform_web::config::Settings;
use platform_web::database::{DbPool, PgUserRepository, UserRepository};
use platform_web::state::AppState;
use platform_web::telemetry;

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    let _log_guard = telemetry::init_logger()?;

    info!("🚀 Starting platform web frontend...");

    let auth_client = Arc::new(HttpAuthClient::new(
        &settings.auth.base_url,
        settings.auth.timeout,
    )?);
    info!(auth_service_url = %auth_client.base_url(), "✅ Auth service client ready");

    let db_pool = match &settings.database {
        Some(db) => Some(DbPool::connect(db).await?),
        None => {
            warn!("DB_URL not set; user persistence and admin statistics are disabled");
            None
        }
    };
    let users = db_pool
        .as_ref()
        .map(|pool| Arc::new(PgUserRepository::new(pool.get_pool().clone())) as Arc<dyn UserRepository>);

    let addr = settings.bind_addr()?;
    let grace = settings.server.shutdown_grace;

    let state = AppState::new(settings, auth_client, users)?;
    let sweeper = state.session_cache.spawn_sweeper(CACHE_SWEEP_INTERVAL);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🎯 Server listening on {}", addr);

    let shutdown = Arc::new(Notify::new());
    let server = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.notified().await })
                .await
        })
    };

    shutdown_signal().await;
    info!("Shutdown signal received; draining connections");
    shutdown.notify_one();

    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => info!("Server stopped"),
        Ok(Ok(Err(e))) => error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "Server task failed"),
        Err(_) => warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out"),
    }

    sweeper.abort();
    if let Some(pool) = db_pool {
        pool.close().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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
}
