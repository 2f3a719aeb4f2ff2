//! Serve command handler.

use clap::Args;
use sift_core::{config::AppConfig, AppError, AppResult};
use sift_server::{router, AppState, Pipeline};
use std::time::Duration;
use tokio::signal;

/// Run the HTTP / WebSocket server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to listen on (e.g. 127.0.0.1:8000)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Delay in milliseconds before each streamed message
    #[arg(long)]
    pub pacing_ms: Option<u64>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pipeline = Pipeline::from_config(config)?;
        let state = AppState::new(pipeline, Duration::from_millis(config.server.pacing_ms));

        let listener = tokio::net::TcpListener::bind(&config.server.bind)
            .await
            .map_err(|e| {
                AppError::Config(format!("failed to bind {}: {}", config.server.bind, e))
            })?;
        let addr = listener.local_addr()?;

        tracing::info!(
            %addr,
            pacing_ms = config.server.pacing_ms,
            "Listening on ws://{}/ws/chat and http://{}/chat",
            addr,
            addr
        );

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
