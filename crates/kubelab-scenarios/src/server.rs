//! Shared serving loop for every HTTP scenario.
//!
//! Binds `0.0.0.0:<port>`, attaches request tracing, and shuts down
//! gracefully on Ctrl+C or SIGTERM (what the kubelet sends on pod
//! termination).

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::error::ScenarioError;

/// Serves `router` on all interfaces at `port` until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server loop fails.
pub async fn serve(router: Router, port: u16, scenario: &str) -> Result<(), ScenarioError> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ScenarioError::Bind { address, source })?;

    tracing::info!(%address, scenario, "server listening");
    serve_on(listener, router).await?;
    tracing::info!(scenario, "server shut down");
    Ok(())
}

/// Serves `router` on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server loop fails.
pub async fn serve_on(listener: TcpListener, router: Router) -> Result<(), ScenarioError> {
    let app = router.layer(TraceLayer::new_for_http());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ScenarioError::Serve)
}

/// Current local time as an ISO-8601 string with microseconds and no offset.
#[must_use]
pub fn iso_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let _ = sigterm.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
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
}
