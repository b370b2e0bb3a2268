//! Missing-ConfigMap scenario.
//!
//! A blog front page whose settings come from a JSON file mounted from a
//! ConfigMap. Without the mount the app refuses to start.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use kubelab_common::error::KubelabError;
use kubelab_common::types::PodName;
use serde_json::{Map, Value, json};

use crate::error::ScenarioError;
use crate::html::{escape, header, page};

/// Settings the front page renders, with the defaults used for absent keys.
#[derive(Debug, Clone, PartialEq)]
pub struct BlogSettings {
    /// Blog title.
    pub blog_name: String,
    /// Subtitle under the title.
    pub tagline: String,
    /// Author credited on every post.
    pub author: String,
    /// Theme name.
    pub theme: String,
    /// Posts shown per page.
    pub max_posts_per_page: u32,
    /// Whether comments are enabled.
    pub comments_enabled: bool,
}

impl Default for BlogSettings {
    fn default() -> Self {
        Self {
            blog_name: "My Blog".into(),
            tagline: "Powered by Kubernetes".into(),
            author: "Unknown".into(),
            theme: "default".into(),
            max_posts_per_page: 10,
            comments_enabled: false,
        }
    }
}

impl BlogSettings {
    /// Reads the known keys from a config object.
    ///
    /// A key that is absent, null or of an unexpected type keeps its default.
    #[must_use]
    pub fn from_map(raw: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            raw.get(key)
                .and_then(Value::as_str)
                .map_or(default, str::to_string)
        };
        Self {
            blog_name: text("blog_name", defaults.blog_name),
            tagline: text("tagline", defaults.tagline),
            author: text("author", defaults.author),
            theme: text("theme", defaults.theme),
            max_posts_per_page: raw
                .get("max_posts_per_page")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_posts_per_page),
            comments_enabled: raw
                .get("comments_enabled")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.comments_enabled),
        }
    }
}

/// Configuration as loaded from disk: the raw object and its typed view.
#[derive(Debug, Clone)]
pub struct BlogConfig {
    /// The file contents, served verbatim on `/config`.
    pub raw: Map<String, Value>,
    /// Typed settings derived from `raw`.
    pub settings: BlogSettings,
}

/// Loads the blog configuration from a mounted JSON file.
///
/// # Errors
///
/// Returns an I/O error if the file is missing or unreadable, a
/// serialization error if it is not valid JSON, and a configuration error
/// if it is not a JSON object.
pub fn load_config(path: &Path) -> Result<BlogConfig, ScenarioError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            tracing::error!(path = %path.display(), "ERROR: Configuration file not found at {}", path.display());
            tracing::error!("Make sure the ConfigMap is mounted correctly!");
        }
        KubelabError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| {
        tracing::error!(error = %e, "ERROR: Invalid JSON in configuration");
        KubelabError::from(e)
    })?;

    let Value::Object(raw) = value else {
        return Err(KubelabError::Config {
            message: format!("{} must contain a JSON object", path.display()),
        }
        .into());
    };

    let settings = BlogSettings::from_map(&raw);

    tracing::info!(path = %path.display(), config = %serde_json::Value::Object(raw.clone()), "Configuration loaded");
    Ok(BlogConfig { raw, settings })
}

/// Shared state of the blog app.
#[derive(Debug, Clone)]
pub struct BlogState {
    /// Loaded configuration.
    pub config: Arc<BlogConfig>,
    /// Pod the app is running in.
    pub pod: PodName,
}

/// Builds the blog router.
pub fn router(state: BlogState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/config", get(config))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<BlogState>) -> Html<String> {
    let s = &state.config.settings;
    let comments = if s.comments_enabled { "Enabled" } else { "Disabled" };
    let posts: String = SAMPLE_POSTS
        .iter()
        .take(s.max_posts_per_page as usize)
        .map(|(title, excerpt)| {
            format!(
                r#"<div class="card post"><h2>{}</h2><p class="meta">By {}</p><p>{}</p></div>"#,
                escape(title),
                escape(&s.author),
                escape(excerpt)
            )
        })
        .collect();

    let body = format!(
        r#"{header}
<div class="ok"><strong>Configuration loaded from ConfigMap</strong></div>
<div class="card">
    <h2>Blog Settings</h2>
    <table>
        <tr><th>Author</th><td>{author}</td></tr>
        <tr><th>Theme</th><td>{theme}</td></tr>
        <tr><th>Posts per page</th><td>{max_posts}</td></tr>
        <tr><th>Comments</th><td>{comments}</td></tr>
    </table>
</div>
{posts}"#,
        header = header(&s.blog_name, &s.tagline, state.pod.as_str()),
        author = escape(&s.author),
        theme = escape(&s.theme),
        max_posts = s.max_posts_per_page,
    );
    page(&s.blog_name, ".post .meta { color: #666; font-size: 0.9em; }", &body)
}

async fn config(State(state): State<BlogState>) -> Json<Map<String, Value>> {
    Json(state.config.raw.clone())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "config_loaded": true }))
}

const SAMPLE_POSTS: &[(&str, &str)] = &[
    (
        "Getting Started with Kubernetes",
        "Pods, Deployments and Services: the three objects you will touch every day.",
    ),
    (
        "ConfigMaps Explained",
        "Keep configuration out of your images and mount it where the app expects it.",
    ),
    (
        "Debugging Pods Like a Pro",
        "kubectl describe, kubectl logs and kubectl get events tell you almost everything.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("blog.json");
        std::fs::write(&path, content).expect("write config");
        path
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config(&dir.path().join("blog.json")).expect_err("must fail");
        assert!(matches!(err, ScenarioError::Common(KubelabError::Io { .. })));
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "{ not json");
        let err = load_config(&path).expect_err("must fail");
        assert!(matches!(
            err,
            ScenarioError::Common(KubelabError::Serialization { .. })
        ));
    }

    #[test]
    fn non_object_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), "[1, 2, 3]");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn absent_keys_use_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), r#"{"blog_name": "K8s Diaries"}"#);
        let config = load_config(&path).expect("load");
        assert_eq!(config.settings.blog_name, "K8s Diaries");
        assert_eq!(config.settings.tagline, "Powered by Kubernetes");
        assert_eq!(config.settings.max_posts_per_page, 10);
        assert!(!config.settings.comments_enabled);
    }

    #[test]
    fn mistyped_keys_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            dir.path(),
            r#"{"max_posts_per_page": "20", "author": null, "comments_enabled": "yes", "theme": "dark"}"#,
        );
        let config = load_config(&path).expect("load");
        assert_eq!(config.settings.max_posts_per_page, 10);
        assert_eq!(config.settings.author, "Unknown");
        assert!(!config.settings.comments_enabled);
        assert_eq!(config.settings.theme, "dark");
        assert_eq!(config.raw["max_posts_per_page"], "20");
    }

    #[tokio::test]
    async fn config_endpoint_returns_file_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(dir.path(), r#"{"blog_name": "K8s Diaries", "extra": [1]}"#);
        let state = BlogState {
            config: Arc::new(load_config(&path).expect("load")),
            pod: PodName::new("blog-1"),
        };

        let response = router(state)
            .oneshot(Request::get("/config").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"blog_name": "K8s Diaries", "extra": [1]}));
    }

    #[tokio::test]
    async fn index_renders_escaped_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            dir.path(),
            r#"{"blog_name": "<Ops>", "author": "Ana", "comments_enabled": true}"#,
        );
        let state = BlogState {
            config: Arc::new(load_config(&path).expect("load")),
            pod: PodName::new("blog-1"),
        };

        let response = router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("&lt;Ops&gt;"));
        assert!(html.contains("By Ana"));
        assert!(html.contains("Enabled"));
        assert!(html.contains("Pod: blog-1"));
    }
}
