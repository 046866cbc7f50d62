//! Parley server library.
//!
//! Provides a reusable server function to serve Parley either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod api;
mod error;
mod health;
mod identity;
mod layer;

use std::net::SocketAddr;
use std::sync::Arc;

use ::rate_limit::RateLimitManager;
use anyhow::anyhow;
use api::AppState;
use axum::{Router, routing::get};
use config::Config;
use layer::{AccessHoursLayer, RateLimitLayer, RequestLogLayer, RoleLayer};
use messaging::{Database, MessagingService};
use tokio::net::TcpListener;

/// Configuration for serving Parley.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Parley TOML configuration.
    pub config: Config,
}

/// Starts and runs the Parley server with the provided configuration.
///
/// Returns after a shutdown signal, once in-flight requests are done.
pub async fn serve(ServeConfig { listen_address, config }: ServeConfig) -> anyhow::Result<()> {
    let service = Arc::new(MessagingService::new(Database::new(), &config.storage));
    let identity = Arc::new(config.server.identity.clone());

    let mut app = api::router(AppState {
        service: service.clone(),
        identity: identity.clone(),
    });

    // Each layer wraps the ones before it, so they are added innermost first.
    if config.server.rate_limits.enabled {
        log::debug!("Initializing rate limit manager with configured limits");

        let manager = Arc::new(RateLimitManager::new(config.server.rate_limits.clone())?);
        tokio::spawn(layer::purge_idle_windows(manager.clone(), config.server.rate_limits.window));

        app = app.layer(RateLimitLayer::new(manager));
    } else {
        log::debug!("Rate limiting disabled");
    }

    if !config.server.roles.protected_paths.is_empty() {
        log::debug!(
            "Restricting {:?} to roles {:?}",
            config.server.roles.protected_paths,
            config.server.roles.allowed_roles
        );

        app = app.layer(RoleLayer::new(
            config.server.roles.clone(),
            identity.clone(),
            service.clone(),
        ));
    }

    if let Some(hours) = config.server.access_hours {
        log::debug!("Accepting requests from {}:00 to {}:00", hours.start_hour, hours.end_hour);
        app = app.layer(AccessHoursLayer::new(hours));
    }

    if config.server.request_log.enabled {
        app = app.layer(RequestLogLayer::new(&config.server.request_log, identity.clone()));
    }

    // Add health endpoint (unprotected - added AFTER the middleware)
    if config.server.health.enabled {
        let health_router = Router::new()
            .route(&config.server.health.path, get(health::health))
            .with_state(service.clone());

        app = app.merge(health_router);
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    log::info!("Messaging API available at: http://{listen_address}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;

    service.database().close();
    log::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for the shutdown signal: {e}");
        std::future::pending::<()>().await;
    }

    log::info!("Shutdown signal received, draining connections");
}
