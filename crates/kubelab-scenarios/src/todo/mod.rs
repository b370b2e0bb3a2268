//! Init-container scenario, application side.
//!
//! A todo list stored in Redis. The pod's init container waits for Redis;
//! if the app starts anyway without a database it stays up and says so.

mod store;

pub use store::{RedisTodoStore, Todo, TodoStore};

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use kubelab_common::types::PodName;
use serde::Deserialize;
use serde_json::json;

use crate::error::ScenarioError;
use crate::html::{escape, header, page};

/// Shared state of the todo app.
#[derive(Clone)]
pub struct TodoState {
    store: Option<Arc<dyn TodoStore>>,
    pod: PodName,
}

impl TodoState {
    /// Creates the state; `None` means the database is not ready.
    #[must_use]
    pub fn new(store: Option<Arc<dyn TodoStore>>, pod: PodName) -> Self {
        Self { store, pod }
    }

    /// Connects to Redis, falling back to "database not ready" on failure.
    pub async fn connect(host: &str, port: u16, pod: PodName) -> Self {
        match RedisTodoStore::connect(host, port).await {
            Ok(store) => {
                tracing::info!(host, port, "Connected to Redis at {host}:{port}");
                let store: Arc<dyn TodoStore> = Arc::new(store);
                Self::new(Some(store), pod)
            }
            Err(e) => {
                tracing::error!(host, port, error = %e, "Cannot connect to Redis");
                Self::new(None, pod)
            }
        }
    }

    /// Whether a database is attached.
    #[must_use]
    pub fn db_ready(&self) -> bool {
        self.store.is_some()
    }
}

/// Builds the todo app router.
pub fn router(state: TodoState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", post(add))
        .route("/complete/{id}", post(complete))
        .route("/delete/{id}", post(delete))
        .route("/health", get(health))
        .with_state(state)
}

const STYLE: &str = r"
        .todo-item { padding: 15px; margin: 10px 0; background: #f8f9fa; border-radius: 5px; display: flex; justify-content: space-between; align-items: center; }
        .todo-item.completed { opacity: 0.6; text-decoration: line-through; }
        .todo-input { width: 70%; padding: 15px; border: 2px solid #667eea; border-radius: 5px; font-size: 1em; }
        .complete-btn { background: #28a745; margin-right: 5px; }
        .delete-btn { background: #dc3545; }
";

async fn index(State(state): State<TodoState>) -> Result<Html<String>, ScenarioError> {
    let content = match &state.store {
        None => r#"<div class="error">
    <h2>Database Not Ready</h2>
    <p>The app started before Redis was available.</p>
    <p>The init container should have waited for the database service.</p>
</div>"#
            .to_string(),
        Some(store) => {
            let todos = store.list().await?;
            let items: String = todos
                .iter()
                .map(|todo| {
                    format!(
                        r#"<div class="todo-item{done}">
    <span>{text} <small>{created}</small></span>
    <span>{complete}<button class="delete-btn" onclick="act('delete', '{id}')">Delete</button></span>
</div>"#,
                        done = if todo.completed { " completed" } else { "" },
                        text = escape(&todo.text),
                        created = escape(&todo.created_at),
                        complete = if todo.completed {
                            String::new()
                        } else {
                            format!(
                                r#"<button class="complete-btn" onclick="act('complete', '{}')">Done</button>"#,
                                escape(&todo.id)
                            )
                        },
                        id = escape(&todo.id),
                    )
                })
                .collect();
            let list = if todos.is_empty() {
                "<p>No todos yet. Add one above!</p>".to_string()
            } else {
                items
            };
            format!(
                r#"<div class="card">
    <input class="todo-input" id="todoText" placeholder="What needs to be done?">
    <button onclick="addTodo()">Add</button>
</div>
<div class="card">
    <h2>Todos ({count})</h2>
    {list}
</div>
<script>
function addTodo() {{
    const text = document.getElementById('todoText').value;
    if (!text) return;
    fetch('/add', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify({{text: text}})}})
        .then(r => r.json()).then(() => location.reload());
}}
function act(action, id) {{
    fetch('/' + action + '/' + id, {{method: 'POST'}}).then(() => location.reload());
}}
</script>"#,
                count = todos.len(),
            )
        }
    };

    let body = format!(
        "{}\n{content}",
        header("TODO App", "Backed by Redis", state.pod.as_str())
    );
    Ok(page("TODO App", STYLE, &body))
}

#[derive(Debug, Deserialize)]
struct AddRequest {
    #[serde(default)]
    text: String,
}

// The body is parsed only once a store is known to exist.
async fn add(State(state): State<TodoState>, body: Bytes) -> Result<Response, ScenarioError> {
    let Some(store) = &state.store else {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "success": false, "error": "Database not ready" })),
        )
            .into_response());
    };
    let request: AddRequest = serde_json::from_slice(&body)
        .map_err(|e| ScenarioError::BadRequest(format!("invalid todo: {e}")))?;
    let id = store.add(&request.text).await?;
    tracing::info!(id, "todo added");
    Ok(Json(json!({ "success": true, "id": id })).into_response())
}

fn not_ready() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "success": false }))).into_response()
}

async fn complete(State(state): State<TodoState>, Path(id): Path<String>) -> Result<Response, ScenarioError> {
    let Some(store) = &state.store else {
        return Ok(not_ready());
    };
    store.complete(&id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}

async fn delete(State(state): State<TodoState>, Path(id): Path<String>) -> Result<Response, ScenarioError> {
    let Some(store) = &state.store else {
        return Ok(not_ready());
    };
    store.delete(&id).await?;
    Ok(Json(json!({ "success": true })).into_response())
}

async fn health(State(state): State<TodoState>) -> Response {
    let Some(store) = &state.store else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "database": "not ready" })),
        )
            .into_response();
    };
    match store.ping().await {
        Ok(()) => Json(json!({ "status": "healthy", "database": "connected" })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "redis ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "disconnected" })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::store::memory::MemoryTodoStore;
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header as http_header};
    use serde_json::Value;
    use tower::ServiceExt;

    fn with_store() -> (TodoState, Arc<MemoryTodoStore>) {
        let store = Arc::new(MemoryTodoStore::default());
        let shared: Arc<dyn TodoStore> = store.clone();
        let state = TodoState::new(Some(shared), PodName::new("todo-1"));
        (state, store)
    }

    async fn call(state: &TodoState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn add_request(text: &str) -> Request<Body> {
        Request::post("/add")
            .header(http_header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "text": text }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn add_complete_delete_flow() {
        let (state, store) = with_store();

        let (status, body) = call(&state, add_request("buy milk")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "id": 1 }));

        let (status, _) = call(&state, Request::post("/complete/1").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.list().await.unwrap()[0].completed);

        let (status, body) = call(&state, Request::post("/delete/1").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_a_no_op() {
        let (state, _) = with_store();
        let (status, body) = call(&state, Request::post("/complete/42").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn without_database_mutations_are_503() {
        let state = TodoState::new(None, PodName::default());
        assert!(!state.db_ready());

        let (status, body) = call(&state, add_request("x")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "success": false, "error": "Database not ready" }));

        let (status, body) = call(&state, Request::post("/delete/1").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "success": false }));
    }

    #[tokio::test]
    async fn add_without_database_ignores_the_body() {
        let state = TodoState::new(None, PodName::default());
        let request = Request::post("/add")
            .header(http_header::CONTENT_TYPE, "text/plain")
            .body(Body::from("text=buy milk"))
            .unwrap();
        let (status, body) = call(&state, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Database not ready");
    }

    #[tokio::test]
    async fn add_with_malformed_body_is_400() {
        let (state, store) = with_store();
        let request = Request::post("/add").body(Body::from("not json")).unwrap();
        let (status, body) = call(&state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reflects_database_state() {
        let (state, store) = with_store();
        let (status, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy", "database": "connected" }));

        store.set_down(true);
        let (status, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");

        let state = TodoState::new(None, PodName::default());
        let (status, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({ "status": "unhealthy", "database": "not ready" }));
    }

    #[tokio::test]
    async fn index_shows_not_ready_banner() {
        let state = TodoState::new(None, PodName::default());
        let response = router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Database Not Ready"));
    }

    #[tokio::test]
    async fn index_escapes_todo_text() {
        let (state, store) = with_store();
        let _ = store.add("<script>").await.unwrap();
        let response = router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8_lossy(&bytes);
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Todos (1)"));
    }
}
