// src/bin/api_server.rs

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tsdb_gateway::infra::logging;
use tsdb_gateway::transport::{self, http::WebOptions};
use tsdb_gateway::{AuthValidator, GatewayConfig, MemoryBackend, SecretCredentialStore};

const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init()?;

    let config = GatewayConfig::from_env()?;

    // --- Backend ---
    let mut backend = MemoryBackend::new(config.dbname.clone());
    if let Some(max) = config.max_concurrent {
        backend = backend.with_max_concurrent(max);
    }
    info!(dbname = %config.dbname, "using in-memory backend");
    let mut app_state = transport::http::AppState::new(Arc::new(backend));

    // --- Authentication ---
    if let Some(secret) = &config.secret {
        let store = Arc::new(
            SecretCredentialStore::new(secret, config.token_expiration_secs)
                .with_refresh_lifetime(config.refresh_expiration_secs),
        );
        let purge_store = store.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TOKEN_PURGE_INTERVAL);
            loop {
                ticker.tick().await;
                let purged = purge_store.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "purged expired tokens");
                }
            }
        });
        app_state = app_state.with_auth(AuthValidator::new(store, config.token_required));
    }

    if config.enable_web {
        app_state = app_state.with_web(WebOptions {
            static_dir: config.static_dir.clone(),
        });
    }

    // --- API Server ---
    let app = transport::http::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %listener.local_addr()?,
        auth = config.auth_enabled(),
        web = config.enable_web,
        "serving gateway"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received (Ctrl+C)");
        })
        .await?;

    info!("graceful shutdown complete");
    Ok(())
}
