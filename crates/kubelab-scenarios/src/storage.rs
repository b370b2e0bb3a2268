//! PVC-pending scenario.
//!
//! A file upload service that writes to a persistent volume mounted at
//! `/data`. While the claim is Pending the pod never starts; with an
//! unwritable mount `/health` reports `degraded`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use kubelab_common::error::KubelabError;
use kubelab_common::types::PodName;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use unicode_normalization::UnicodeNormalization;

use crate::error::ScenarioError;
use crate::html::{escape, header, page};
use crate::server::iso_timestamp;

/// Extensions accepted for upload, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx"];

/// Largest request body accepted on `/upload`.
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

const HEALTH_CHECK_FILE: &str = ".health_check";

/// Metadata kept for each uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Upload time, ISO-8601.
    pub uploaded_at: String,
    /// Size in KiB.
    pub size_kb: f64,
    /// Pod that handled the upload.
    pub pod: String,
}

/// Uploaded files keyed by sanitized file name.
pub type Metadata = BTreeMap<String, FileRecord>;

/// Whether `filename` carries an allowed extension.
#[must_use]
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Reduces a client-supplied file name to a safe, flat name.
///
/// Accents are decomposed (NFKD) so `é` keeps its base letter, path
/// separators become word breaks, whitespace runs become `_`, only ASCII
/// alphanumerics and `._-` survive, and leading or trailing `.`/`_` are
/// trimmed. The result may be empty.
#[must_use]
pub fn secure_filename(filename: &str) -> String {
    let decomposed: String = filename.nfkd().collect();
    let flattened = decomposed.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Shared state of the upload service.
#[derive(Debug, Clone)]
pub struct StorageState {
    uploads: PathBuf,
    metadata_file: PathBuf,
    metadata_lock: Arc<Mutex<()>>,
    pod: PodName,
}

impl StorageState {
    /// Prepares the upload directory under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created.
    pub fn open(data_dir: &Path, pod: PodName) -> Result<Self, ScenarioError> {
        let uploads = data_dir.join("uploads");
        std::fs::create_dir_all(&uploads).map_err(|source| KubelabError::Io {
            path: uploads.clone(),
            source,
        })?;
        Ok(Self {
            uploads,
            metadata_file: data_dir.join("metadata.json"),
            metadata_lock: Arc::new(Mutex::new(())),
            pod,
        })
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    /// Reads the metadata index; a missing file is an empty index.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_metadata(&self) -> Result<Metadata, ScenarioError> {
        match tokio::fs::read_to_string(&self.metadata_file).await {
            Ok(content) => Ok(serde_json::from_str(&content).map_err(KubelabError::from)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Metadata::new()),
            Err(source) => Err(KubelabError::Io {
                path: self.metadata_file.clone(),
                source,
            }
            .into()),
        }
    }

    async fn save_metadata(&self, metadata: &Metadata) -> Result<(), ScenarioError> {
        let json = serde_json::to_string_pretty(metadata).map_err(KubelabError::from)?;
        tokio::fs::write(&self.metadata_file, json)
            .await
            .map_err(|source| KubelabError::Io {
                path: self.metadata_file.clone(),
                source,
            })?;
        Ok(())
    }

    /// Stores an uploaded file and records it in the metadata index.
    ///
    /// Returns the stored name and its size in bytes.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for disallowed or unusable names and an I/O
    /// error if the volume cannot be written.
    pub async fn store(&self, filename: &str, data: &[u8]) -> Result<(String, u64), ScenarioError> {
        if !allowed_file(filename) {
            return Err(ScenarioError::BadRequest("File type not allowed".into()));
        }
        let name = secure_filename(filename);
        if name.is_empty() {
            return Err(ScenarioError::BadRequest("Invalid file name".into()));
        }

        let path = self.uploads.join(&name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| KubelabError::Io {
                path: path.clone(),
                source,
            })?;
        let size = data.len() as u64;

        let _guard = self.metadata_lock.lock().await;
        let mut metadata = self.load_metadata().await?;
        #[allow(clippy::cast_precision_loss)]
        let size_kb = size as f64 / 1024.0;
        let _ = metadata.insert(
            name.clone(),
            FileRecord {
                uploaded_at: iso_timestamp(),
                size_kb,
                pod: self.pod.to_string(),
            },
        );
        self.save_metadata(&metadata).await?;

        tracing::info!(file = %name, size, "File uploaded: {name} ({size} bytes)");
        Ok((name, size))
    }

    /// Writes and removes a probe file to check the volume is writable.
    pub async fn storage_writable(&self) -> bool {
        let probe = self.uploads.join(HEALTH_CHECK_FILE);
        let result = async {
            tokio::fs::write(&probe, b"ok").await?;
            tokio::fs::remove_file(&probe).await
        }
        .await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, path = %probe.display(), "storage not writable");
        }
        result.is_ok()
    }
}

/// Builds the upload service router.
pub fn router(state: StorageState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn index(State(state): State<StorageState>) -> Result<Html<String>, ScenarioError> {
    let metadata = state.load_metadata().await?;
    let rows: String = metadata
        .iter()
        .map(|(name, record)| {
            format!(
                "<tr><td>{}</td><td>{:.2} KB</td><td>{}</td><td>{}</td></tr>",
                escape(name),
                record.size_kb,
                escape(&record.uploaded_at),
                escape(&record.pod)
            )
        })
        .collect();
    let files = if metadata.is_empty() {
        "<p>No files uploaded yet.</p>".to_string()
    } else {
        format!("<table><tr><th>File</th><th>Size</th><th>Uploaded</th><th>Pod</th></tr>{rows}</table>")
    };

    let body = format!(
        r#"{}
<div class="card">
    <h2>Upload a File</h2>
    <form id="uploadForm">
        <input type="file" id="fileInput" name="file" required>
        <button type="submit">Upload</button>
    </form>
    <p>Allowed: {allowed}</p>
    <p id="result"></p>
</div>
<div class="card">
    <h2>Stored Files ({count})</h2>
    {files}
</div>
<script>
document.getElementById('uploadForm').addEventListener('submit', function(e) {{
    e.preventDefault();
    const data = new FormData();
    data.append('file', document.getElementById('fileInput').files[0]);
    fetch('/upload', {{method: 'POST', body: data}})
        .then(r => r.json())
        .then(d => {{ document.getElementById('result').textContent = d.success ? ('Uploaded ' + d.filename) : d.message; if (d.success) setTimeout(() => location.reload(), 800); }});
}});
</script>"#,
        header("File Upload Service", "Files persist on a PersistentVolume", state.pod.as_str()),
        allowed = ALLOWED_EXTENSIONS.join(", "),
        count = metadata.len(),
    );
    Ok(page("File Upload Service", "", &body))
}

async fn upload(
    State(state): State<StorageState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ScenarioError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ScenarioError::BadRequest(format!("invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        // A plain form field named `file` carries no upload.
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() {
            return Err(ScenarioError::BadRequest("No file selected".into()));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ScenarioError::BadRequest(format!("invalid upload: {e}")))?;
        let (name, size) = state.store(&filename, &data).await?;
        return Ok(Json(json!({ "success": true, "filename": name, "size": size })));
    }
    Err(ScenarioError::BadRequest("No file provided".into()))
}

async fn list_files(State(state): State<StorageState>) -> Result<Json<Value>, ScenarioError> {
    let metadata = state.load_metadata().await?;
    Ok(Json(json!({ "count": metadata.len(), "files": metadata })))
}

async fn health(State(state): State<StorageState>) -> Json<Value> {
    let ok = state.storage_writable().await;
    Json(json!({
        "status": if ok { "healthy" } else { "degraded" },
        "storage": if ok { "writable" } else { "not writable" },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    const BOUNDARY: &str = "kubelab-boundary";

    fn multipart_body(field: &str, filename: &str, content: &str) -> Body {
        Body::from(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        ))
    }

    fn multipart_bytes(filename: &str, content: &[u8]) -> Body {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn plain_field_body(field: &str, value: &str) -> Body {
        Body::from(format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
        ))
    }

    fn upload_request(body: Body) -> Request<Body> {
        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    async fn call(state: &StorageState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn allowed_file_checks_last_extension() {
        assert!(allowed_file("report.PDF"));
        assert!(allowed_file("archive.tar.txt"));
        assert!(!allowed_file("script.sh"));
        assert!(!allowed_file("noextension"));
    }

    #[test]
    fn secure_filename_flattens_paths() {
        assert_eq!(secure_filename("../../etc/passwd.txt"), "etc_passwd.txt");
        assert_eq!(secure_filename("my cool file.txt"), "my_cool_file.txt");
        assert_eq!(secure_filename("résumé.pdf"), "resume.pdf");
        assert_eq!(secure_filename("..."), "");
    }

    #[tokio::test]
    async fn upload_stores_file_and_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::new("storage-1")).expect("open");

        let (status, body) = call(&state, upload_request(multipart_body("file", "notes.txt", "hello"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "notes.txt");
        assert_eq!(body["size"], 5);

        let stored = std::fs::read_to_string(dir.path().join("uploads/notes.txt")).expect("stored");
        assert_eq!(stored, "hello");

        let metadata = state.load_metadata().await.expect("metadata");
        assert_eq!(metadata["notes.txt"].pod, "storage-1");
    }

    #[tokio::test]
    async fn upload_rejects_disallowed_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let (status, body) = call(&state, upload_request(multipart_body("file", "run.sh", "echo"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "File type not allowed");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let (status, body) = call(&state, upload_request(multipart_body("other", "a.txt", "x"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file provided");
    }

    #[tokio::test]
    async fn upload_accepts_files_larger_than_two_mib() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let content = vec![b'x'; 3 * 1024 * 1024];

        let (status, body) = call(&state, upload_request(multipart_bytes("big.pdf", &content))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["size"], 3 * 1024 * 1024);
        let stored = std::fs::metadata(dir.path().join("uploads/big.pdf")).expect("stored");
        assert_eq!(stored.len(), 3 * 1024 * 1024);
        let metadata = state.load_metadata().await.expect("metadata");
        assert!((metadata["big.pdf"].size_kb - 3072.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn upload_with_empty_filename_is_not_selected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let (status, body) = call(&state, upload_request(multipart_body("file", "", ""))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file selected");
    }

    #[tokio::test]
    async fn file_field_without_filename_is_not_provided() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let (status, body) = call(&state, upload_request(plain_field_body("file", "just text"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No file provided");
    }

    #[tokio::test]
    async fn stripped_name_keeps_its_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");

        // The allowed extension always survives sanitizing.
        let (name, _) = state.store("日本語.txt", b"x").await.expect("store");
        assert_eq!(name, "txt");
        assert!(secure_filename("日本語").is_empty());
    }

    #[tokio::test]
    async fn files_lists_uploads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let _ = state.store("a.txt", b"1").await.expect("store a");
        let _ = state.store("b.png", b"22").await.expect("store b");

        let (status, body) = call(&state, Request::get("/files").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert!(body["files"]["b.png"]["size_kb"].is_number());
    }

    #[tokio::test]
    async fn health_reports_writable_volume() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        let (status, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "storage": "writable"}));
        assert!(!dir.path().join("uploads/.health_check").exists());
    }

    #[tokio::test]
    async fn health_reports_degraded_when_volume_is_gone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = StorageState::open(dir.path(), PodName::default()).expect("open");
        std::fs::remove_dir_all(state.uploads_dir()).expect("remove uploads");
        let (_, body) = call(&state, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["storage"], "not writable");
    }
}
