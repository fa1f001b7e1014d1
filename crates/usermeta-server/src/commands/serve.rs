//! `serve`: bootstrap the stores and run the HTTP server until shutdown

use crate::config::AppConfig;
use crate::storage::{Database, RedisStore};
use crate::{router, AppState};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use usermeta_core::{CoordinationStore, LockCoordinator, TokenService, UserStore};

pub async fn run(config: AppConfig) -> Result<()> {
    info!("Connecting to postgres: {}", config.database.address());
    let db = Arc::new(
        Database::connect(&config.database)
            .await
            .context("Failed to initialize database")?,
    );

    info!("Connecting to redis: {}", config.redis.address);
    let redis = match RedisStore::connect(&config.redis).await {
        Ok(redis) => Arc::new(redis),
        Err(e) => {
            db.close().await;
            return Err(e).context("Failed to initialize redis");
        }
    };

    let tokens = Arc::new(TokenService::new(
        &config.token.secret,
        config.token.expires_in(),
    ));
    let coordination: Arc<dyn CoordinationStore> = redis.clone();
    let locks = LockCoordinator::new(coordination, config.lock_ttl());
    let users: Arc<dyn UserStore> = db.clone();
    let app = router(AppState::new(users, tokens, locks));

    let served = serve(&config.address, app).await;

    if let Err(e) = redis.close().await {
        error!("Failed to close redis: {}", e);
    }
    db.close().await;

    served
}

async fn serve(address: &str, app: axum::Router) -> Result<()> {
    let addr: SocketAddr = address
        .parse()
        .with_context(|| format!("Failed to parse bind address {}", address))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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

    info!("Shutdown signal received, draining connections");
}
