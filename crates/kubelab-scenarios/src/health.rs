//! Probe-failure scenario.
//!
//! An API that takes a while to become ready and can be told to go
//! unhealthy. Probes configured with too short an initial delay, the wrong
//! path or the wrong port turn this into restart loops or a pod that never
//! receives traffic.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kubelab_common::types::PodName;
use serde_json::{Value, json};

/// Time the service needs before it reports ready.
pub const STARTUP_DELAY: Duration = Duration::from_secs(10);

/// Shared state of the probe demo.
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    started: Instant,
    startup_delay: Duration,
    healthy: AtomicBool,
    ready: AtomicBool,
    pod: PodName,
}

impl HealthState {
    /// Creates the state, counting uptime from now.
    #[must_use]
    pub fn new(startup_delay: Duration, pod: PodName) -> Self {
        Self::started_at(Instant::now(), startup_delay, pod)
    }

    /// Creates the state with an explicit start instant.
    #[must_use]
    pub fn started_at(started: Instant, startup_delay: Duration, pod: PodName) -> Self {
        Self {
            inner: Arc::new(Inner {
                started,
                startup_delay,
                healthy: AtomicBool::new(true),
                ready: AtomicBool::new(false),
                pod,
            }),
        }
    }

    /// Time since start.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }

    /// Whether the liveness endpoint reports healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.inner.healthy.load(Ordering::SeqCst)
    }

    /// Whether readiness has latched.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// Latches readiness once the startup delay has passed.
    ///
    /// Readiness is only re-evaluated here, i.e. when `/ready` is probed.
    pub fn check_ready(&self) -> bool {
        if self.uptime() > self.inner.startup_delay {
            self.inner.ready.store(true, Ordering::SeqCst);
        }
        self.is_ready()
    }

    /// Marks the service unhealthy for good.
    pub fn kill(&self) {
        self.inner.healthy.store(false, Ordering::SeqCst);
    }

    fn remaining_secs(&self) -> u64 {
        self.inner.startup_delay.saturating_sub(self.uptime()).as_secs()
    }
}

/// Builds the probe demo router.
pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ready", get(readiness))
        .route("/health", get(liveness))
        .route("/api/data", get(data))
        .route("/kill", get(kill))
        .with_state(state)
}

async fn index(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "service": "API Health Demo",
        "status": "running",
        "healthy": state.is_healthy(),
        "ready": state.is_ready(),
        "uptime": state.uptime().as_secs(),
        "pod": state.inner.pod,
    }))
}

async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    let uptime = state.uptime().as_secs();
    if state.check_ready() {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "message": "Application is ready to receive traffic",
                "uptime": uptime,
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "message": format!("Application is starting up... ({}s remaining)", state.remaining_secs()),
                "uptime": uptime,
            })),
        )
    }
}

async fn liveness(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    if state.is_healthy() {
        (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "message": "Application is running normally" })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "unhealthy", "message": "Application has encountered a fatal error" })),
        )
    }
}

#[allow(clippy::cast_precision_loss)]
async fn data(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    if !state.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Service not ready" })),
        );
    }
    let timestamp = chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0;
    (
        StatusCode::OK,
        Json(json!({
            "data": [
                { "id": 1, "name": "Kubernetes" },
                { "id": 2, "name": "Docker" },
                { "id": 3, "name": "DevOps" },
            ],
            "timestamp": timestamp,
        })),
    )
}

async fn kill(State(state): State<HealthState>) -> Json<Value> {
    state.kill();
    tracing::warn!("application marked as unhealthy");
    Json(json!({ "message": "Application marked as unhealthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn fresh() -> HealthState {
        HealthState::new(Duration::from_secs(3600), PodName::new("api-1"))
    }

    fn warmed_up() -> HealthState {
        let started = Instant::now()
            .checked_sub(Duration::from_secs(20))
            .expect("instant in the past");
        HealthState::started_at(started, Duration::from_secs(10), PodName::new("api-1"))
    }

    async fn call(state: &HealthState, path: &str) -> (StatusCode, Value) {
        let response = router(state.clone())
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_ready_during_startup() {
        let state = fresh();
        let (status, body) = call(&state, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not ready");
        assert!(body["message"].as_str().unwrap().contains("remaining"));
    }

    #[tokio::test]
    async fn ready_after_startup_delay() {
        let state = warmed_up();
        let (status, body) = call(&state, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn data_requires_readiness_probe_to_have_latched() {
        let state = warmed_up();
        let (status, _) = call(&state, "/api/data").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let _ = call(&state, "/ready").await;
        let (status, body) = call(&state, "/api/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "Kubernetes");
    }

    #[tokio::test]
    async fn kill_flips_liveness_to_500() {
        let state = fresh();
        let (status, _) = call(&state, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&state, "/kill").await;
        assert_eq!(body["message"], "Application marked as unhealthy");

        let (status, body) = call(&state, "/health").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "unhealthy");
    }

    #[tokio::test]
    async fn index_reports_flags() {
        let state = fresh();
        let (_, body) = call(&state, "/").await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["ready"], false);
        assert_eq!(body["pod"], "api-1");
    }
}
