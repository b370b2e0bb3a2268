//! OOMKilled scenario.
//!
//! An "image processor" that keeps 10 MiB per processed image in memory
//! and never frees it. Past the container's memory limit the kernel kills
//! it.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ScenarioError;
use crate::html::page;

/// Megabytes retained per processed image.
pub const IMAGE_SIZE_MB: usize = 10;

/// Memory limit the dashboard gauge is scaled to.
pub const GAUGE_LIMIT_MB: usize = 256;

/// Usage above which responses carry an OOM warning.
pub const WARNING_THRESHOLD_MB: usize = 200;

const FILL_BYTE: u8 = 0xA5;

/// Shared state of the image processor.
#[derive(Debug, Clone, Default)]
pub struct MemoryHogState {
    images: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemoryHogState {
    /// Creates an empty processor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images processed so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer lock is poisoned.
    pub fn processed(&self) -> Result<usize, ScenarioError> {
        Ok(self.lock()?.len())
    }

    /// "Processes" `count` images, retaining a filled buffer for each.
    ///
    /// Returns the new total.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer lock is poisoned.
    pub fn process(&self, count: usize) -> Result<usize, ScenarioError> {
        let mut images = self.lock()?;
        for _ in 0..count {
            // Non-zero fill so every page is touched and counted against the cgroup.
            images.push(vec![FILL_BYTE; IMAGE_SIZE_MB * 1024 * 1024]);
        }
        Ok(images.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Vec<u8>>>, ScenarioError> {
        self.images
            .lock()
            .map_err(|_| ScenarioError::Internal("image buffer lock poisoned".into()))
    }
}

/// Memory retained for `processed` images, in megabytes.
#[must_use]
pub const fn memory_used_mb(processed: usize) -> usize {
    processed * IMAGE_SIZE_MB
}

/// Gauge fill relative to [`GAUGE_LIMIT_MB`], capped at 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn memory_percent(used_mb: usize) -> f64 {
    (used_mb as f64 / GAUGE_LIMIT_MB as f64 * 100.0).min(100.0)
}

/// Warning attached to responses once usage is dangerous.
#[must_use]
pub fn memory_warning(used_mb: usize) -> Option<String> {
    (used_mb > WARNING_THRESHOLD_MB).then(|| {
        format!("Memory usage is {used_mb}MB! OOMKilled may occur if limit is too low!")
    })
}

/// Body of `POST /process`.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// Images to process.
    #[serde(default = "one")]
    pub count: usize,
}

const fn one() -> usize {
    1
}

/// Response of `POST /process`.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    /// Images processed since start.
    pub total_processed: usize,
    /// Memory retained, in megabytes.
    pub memory_used_mb: usize,
    /// OOM warning, if usage is high.
    pub warning: Option<String>,
}

/// Builds the image processor router.
pub fn router(state: MemoryHogState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/process", post(process))
        .route("/stats", get(stats))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<MemoryHogState>) -> Result<Html<String>, ScenarioError> {
    let processed = state.processed()?;
    let used = memory_used_mb(processed);
    let percent = memory_percent(used);
    let bar_class = if used > WARNING_THRESHOLD_MB { "danger" } else { "safe" };

    let body = format!(
        r#"<div class="header"><h1>Image Processor</h1><p>Processes images in memory</p></div>
<div class="card">
    <h2>Memory Usage</h2>
    <p>Processed images: <strong id="processed-count">{processed}</strong></p>
    <p>Memory used: <strong><span id="memory-used">{used}</span> MB</strong> of {GAUGE_LIMIT_MB} MB</p>
    <div class="bar"><div id="memory-fill" class="fill {bar_class}" style="width: {percent:.0}%"></div></div>
</div>
<div class="card">
    <h2>Process Images</h2>
    <button onclick="processImages(1)">Process 1</button>
    <button onclick="processImages(5)">Process 5</button>
    <button onclick="processImages(10)">Process 10</button>
    <p id="result"></p>
</div>
<script>
function processImages(count) {{
    fetch('/process', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify({{count: count}})}})
        .then(r => r.json())
        .then(d => {{ document.getElementById('result').textContent = d.warning || ('Total: ' + d.memory_used_mb + 'MB'); setTimeout(() => location.reload(), 800); }})
        .catch(e => {{ document.getElementById('result').textContent = 'Request failed: ' + e; }});
}}

setInterval(() => {{
    fetch('/stats')
        .then(r => r.json())
        .then(d => {{
            document.getElementById('processed-count').textContent = d.total_processed;
            document.getElementById('memory-used').textContent = d.memory_used_mb;
            const fill = document.getElementById('memory-fill');
            fill.style.width = Math.min(d.memory_used_mb / {GAUGE_LIMIT_MB} * 100, 100) + '%';
            fill.className = 'fill ' + (d.memory_used_mb > {WARNING_THRESHOLD_MB} ? 'danger' : 'safe');
        }});
}}, 3000);
</script>"#
    );
    Ok(page(
        "Image Processor",
        ".bar { background: #eee; border-radius: 5px; height: 30px; overflow: hidden; } .fill { height: 100%; } .safe { background: #28a745; } .danger { background: #dc3545; }",
        &body,
    ))
}

async fn process(
    State(state): State<MemoryHogState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ScenarioError> {
    let total = state.process(request.count)?;
    let used = memory_used_mb(total);
    tracing::info!(
        count = request.count,
        total,
        memory_used_mb = used,
        "Processed {} images. Total: {total} images ({used}MB)",
        request.count
    );
    Ok(Json(ProcessResponse {
        total_processed: total,
        memory_used_mb: used,
        warning: memory_warning(used),
    }))
}

async fn stats(State(state): State<MemoryHogState>) -> Result<Json<Value>, ScenarioError> {
    let processed = state.processed()?;
    Ok(Json(json!({
        "total_processed": processed,
        "memory_used_mb": memory_used_mb(processed),
    })))
}

async fn health(State(state): State<MemoryHogState>) -> Result<Json<Value>, ScenarioError> {
    Ok(Json(json!({ "status": "healthy", "processed": state.processed()? })))
}
