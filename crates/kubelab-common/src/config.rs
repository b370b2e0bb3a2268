//! Environment-variable helpers for code that reads the pod environment directly.
//!
//! Scenarios are configured the way Kubernetes manifests configure them:
//! through environment variables injected into the pod. Absent values fall
//! back to defaults; required values must be present and non-empty.

use crate::error::{KubelabError, Result};

/// Returns the value of `key`, or `default` when unset.
#[must_use]
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        tracing::debug!(key, default, "environment variable not set, using default");
        default.to_string()
    })
}

/// Returns the value of `key`, failing when it is unset or empty.
///
/// # Errors
///
/// Returns [`KubelabError::MissingEnv`] if the variable is absent or empty.
pub fn require_env(key: &str) -> Result<String> {
    require_value(key, std::env::var(key).ok())
}

/// Validates an optional value on behalf of `key`.
///
/// # Errors
///
/// Returns [`KubelabError::MissingEnv`] if the value is absent or empty.
pub fn require_value(key: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(KubelabError::MissingEnv { key: key.into() }),
    }
}
