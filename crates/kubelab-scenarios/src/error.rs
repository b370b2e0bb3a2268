//! Error type for the scenario apps and its HTTP mapping.

use std::net::SocketAddr;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kubelab_common::error::KubelabError;
use thiserror::Error;

/// Errors raised while starting or serving a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A shared workspace error (configuration, I/O, serialization).
    #[error(transparent)]
    Common(#[from] KubelabError),

    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address the server tried to bind.
        address: SocketAddr,
        /// Underlying socket error.
        source: std::io::Error,
    },

    /// The server loop terminated with an error.
    #[error("server error: {0}")]
    Serve(std::io::Error),

    /// The client sent something the scenario cannot use.
    #[error("{0}")]
    BadRequest(String),

    /// A dependency the scenario needs is not available.
    #[error("{0}")]
    Unavailable(String),

    /// Redis rejected or failed a command.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Internal failure not caused by the client.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ScenarioError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "success": false, "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
