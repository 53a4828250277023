//! Serve command - Starts the HTTP server.

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::{Cache, Database, EmailQueue, LogMailer, Mailer};

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    tracing::info!("Starting server...");

    let db = Arc::new(Database::connect(&config).await?);

    // Redis only backs rate limiting; the API runs without it.
    let cache = match Cache::try_connect(&config).await {
        Ok(cache) => {
            tracing::info!("Redis cache connected");
            Some(Arc::new(cache))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, rate limiting disabled");
            None
        }
    };

    let mailer: Arc<dyn Mailer> = match EmailQueue::connect(&config).await {
        Ok(queue) => {
            tracing::info!("Email queue ready");
            Arc::new(queue)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Email queue unavailable, emails will be logged only");
            Arc::new(LogMailer)
        }
    };

    let host = args.host.unwrap_or_else(|| config.server_host.clone());
    let port = args.port.unwrap_or(config.server_port);
    let addr = format!("{}:{}", host, port);

    let app = create_router(AppState::from_config(db, cache, mailer, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Server running on http://{}", addr);
    tracing::info!("API documentation on http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
