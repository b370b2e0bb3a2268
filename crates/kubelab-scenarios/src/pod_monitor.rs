//! RBAC-forbidden scenario.
//!
//! A dashboard listing the pods of its own namespace through the
//! Kubernetes API. With a ServiceAccount that lacks `list pods` rights the
//! API answers 403 and the dashboard shows why.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kubelab_common::types::PodName;
use serde::Serialize;
use serde_json::{Value, json};

use crate::html::{escape, header, page};
use crate::kube::{KubeError, Pod, PodSource};

/// One row of the pod table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodSummary {
    /// Pod name.
    pub name: String,
    /// Lifecycle phase.
    pub status: String,
    /// Ready containers over declared containers, e.g. `1/2`.
    pub ready: String,
    /// Sum of container restarts.
    pub restarts: u32,
    /// Compact age such as `42s`, `5m` or `3h`.
    pub age: String,
    /// Node name, or `N/A` when unscheduled.
    pub node: String,
}

/// Formats an age in seconds the way `kubectl get pods` abbreviates it.
#[must_use]
pub fn format_age(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}h", seconds / 3600)
    }
}

/// Summarizes a pod relative to `now`.
#[must_use]
pub fn summarize(pod: &Pod, now: DateTime<Utc>) -> PodSummary {
    let statuses = &pod.status.container_statuses;
    let ready = statuses.iter().filter(|c| c.ready).count();
    let age = pod
        .metadata
        .creation_timestamp
        .map_or_else(|| "N/A".to_string(), |t| format_age((now - t).num_seconds()));

    PodSummary {
        name: pod.metadata.name.clone(),
        status: pod.status.phase.clone().unwrap_or_else(|| "Unknown".into()),
        ready: format!("{ready}/{}", pod.spec.containers.len()),
        restarts: statuses.iter().map(|c| c.restart_count).sum(),
        age,
        node: pod.spec.node_name.clone().unwrap_or_else(|| "N/A".into()),
    }
}

/// Turns an API failure into the message shown to the user.
#[must_use]
pub fn describe_error(err: &KubeError) -> String {
    match err {
        KubeError::Api { status: 403, .. } => {
            "Forbidden: ServiceAccount lacks permission to list pods. Check RBAC configuration!"
                .to_string()
        }
        KubeError::Api { status, reason } => format!("API Error {status}: {reason}"),
        other => format!("Unexpected error: {other}"),
    }
}

/// Shared state of the pod monitor.
#[derive(Clone)]
pub struct PodMonitorState {
    /// Where pods are listed from.
    pub source: Arc<dyn PodSource>,
    /// Namespace being monitored.
    pub namespace: String,
    /// Pod the dashboard itself runs in.
    pub pod: PodName,
}

impl PodMonitorState {
    /// Lists and summarizes the monitored namespace's pods.
    ///
    /// # Errors
    ///
    /// Returns the user-facing error message when listing fails.
    pub async fn fetch_pods(&self) -> Result<Vec<PodSummary>, String> {
        let now = Utc::now();
        match self.source.list_pods(&self.namespace).await {
            Ok(pods) => Ok(pods.iter().map(|p| summarize(p, now)).collect()),
            Err(e) => {
                let message = describe_error(&e);
                tracing::error!(namespace = %self.namespace, error = %e, "ERROR: {message}");
                Err(message)
            }
        }
    }
}

/// Builds the pod monitor router.
pub fn router(state: PodMonitorState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/pods", get(api_pods))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<PodMonitorState>) -> Html<String> {
    let content = match state.fetch_pods().await {
        Ok(pods) if pods.is_empty() => {
            r#"<div class="card"><p>No pods found in this namespace.</p></div>"#.to_string()
        }
        Ok(pods) => {
            let rows: String = pods
                .iter()
                .map(|p| {
                    format!(
                        "<tr><td>{}</td><td class=\"phase-{}\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        escape(&p.name),
                        escape(&p.status.to_lowercase()),
                        escape(&p.status),
                        escape(&p.ready),
                        p.restarts,
                        escape(&p.age),
                        escape(&p.node)
                    )
                })
                .collect();
            format!(
                r#"<div class="card">
    <h2>Pods ({count})</h2>
    <table>
        <tr><th>Name</th><th>Status</th><th>Ready</th><th>Restarts</th><th>Age</th><th>Node</th></tr>
        {rows}
    </table>
</div>"#,
                count = pods.len()
            )
        }
        Err(message) => format!(
            r#"<div class="error">
    <h2>Access Denied</h2>
    <p>{}</p>
    <p>Grant the ServiceAccount a Role with <code>get</code>/<code>list</code> on <code>pods</code> and bind it with a RoleBinding.</p>
</div>"#,
            escape(&message)
        ),
    };

    let body = format!(
        "{}\n{content}",
        header(
            "Pod Monitor Dashboard",
            &format!("Namespace: {}", state.namespace),
            state.pod.as_str()
        )
    );
    page(
        "Pod Monitor Dashboard",
        ".phase-running { color: #28a745; font-weight: bold; } .phase-pending { color: #ffc107; font-weight: bold; } .phase-failed { color: #dc3545; font-weight: bold; }",
        &body,
    )
}

async fn api_pods(State(state): State<PodMonitorState>) -> Response {
    match state.fetch_pods().await {
        Ok(pods) => Json(json!({ "count": pods.len(), "pods": pods })).into_response(),
        Err(error) => (StatusCode::FORBIDDEN, Json(json!({ "error": error }))).into_response(),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
