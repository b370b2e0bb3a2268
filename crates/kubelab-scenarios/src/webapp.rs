//! Port-mismatch scenario.
//!
//! A plain JSON web app listening on `PORT` (default 5000). The lesson is
//! in the manifests: a Service whose `targetPort` does not match the port
//! the container actually listens on.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use kubelab_common::types::PodName;
use serde_json::{Value, json};

use crate::server::iso_timestamp;

/// Shared state of the web app.
#[derive(Debug, Clone, Default)]
pub struct WebappState {
    /// Pod the app is running in.
    pub pod: PodName,
}

/// Builds the web app router.
pub fn router(state: WebappState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .with_state(state)
}

async fn home(State(state): State<WebappState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Welcome to the Kubernetes Masterclass!",
        "scenario": "03 - Port Mismatch",
        "timestamp": iso_timestamp(),
        "pod_name": state.pod,
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": iso_timestamp(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_json(path: &str) -> (StatusCode, Value) {
        let app = router(WebappState {
            pod: PodName::new("webapp-abc"),
        });
        let response = app
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn home_reports_scenario_and_pod() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["scenario"], "03 - Port Mismatch");
        assert_eq!(body["pod_name"], "webapp-abc");
    }

    #[tokio::test]
    async fn health_is_healthy() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }
}
