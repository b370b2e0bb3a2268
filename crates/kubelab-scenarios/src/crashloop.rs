//! CrashLoopBackOff scenario.
//!
//! A worker that refuses to start without `REQUIRED_CONFIG`. Deployed
//! without the variable it exits with status 1, and Kubernetes restarts it
//! with growing back-off.

use std::time::Duration;

use kubelab_common::config::require_value;
use kubelab_common::error::Result;

/// Environment variable the worker cannot start without.
pub const REQUIRED_CONFIG_KEY: &str = "REQUIRED_CONFIG";

/// Default pause between heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Runtime settings for the crashloop worker.
#[derive(Debug, Clone)]
pub struct CrashloopConfig {
    /// Value of `REQUIRED_CONFIG`, if set.
    pub required_config: Option<String>,
    /// Pause between heartbeats.
    pub heartbeat_interval: Duration,
}

/// Validates the required configuration value.
///
/// # Errors
///
/// Returns `KubelabError::MissingEnv` when the value is absent or empty.
pub fn load_required_config(value: Option<String>) -> Result<String> {
    require_value(REQUIRED_CONFIG_KEY, value).inspect_err(|_| {
        tracing::error!("ERROR: {REQUIRED_CONFIG_KEY} environment variable is not set!");
        tracing::error!("Application cannot start without proper configuration.");
    })
}

/// Starts the worker and runs forever once configured.
///
/// # Errors
///
/// Returns an error immediately if `REQUIRED_CONFIG` is missing; the
/// caller turns it into exit status 1.
pub async fn run(config: CrashloopConfig) -> Result<()> {
    tracing::info!("Starting application...");
    let value = load_required_config(config.required_config)?;
    tracing::info!(config = %value, "Configuration loaded");
    tracing::info!("Application started successfully!");

    let _ = heartbeat(config.heartbeat_interval, None).await;
    Ok(())
}

/// Emits heartbeats every `interval`, the first one immediately.
///
/// Stops after `limit` beats when given and returns how many were sent.
pub async fn heartbeat(interval: Duration, limit: Option<u64>) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    let mut counter = 0;
    loop {
        let _ = ticker.tick().await;
        counter += 1;
        tracing::info!(heartbeat = counter, "Application is running... (heartbeat #{counter})");
        if limit.is_some_and(|max| counter >= max) {
            return counter;
        }
    }
}
