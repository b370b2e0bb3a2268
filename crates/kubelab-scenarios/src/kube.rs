//! Minimal Kubernetes API client for listing pods.
//!
//! Only what the pod monitor needs: discover the API server (in-cluster
//! service account, else a `kubectl proxy` URL), then `GET` the pod list of
//! one namespace.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kubelab_common::config::{env_or, require_env};
use serde::Deserialize;
use thiserror::Error;

/// Directory where Kubernetes mounts the pod's service account credentials.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// API URL used outside a cluster, as exposed by `kubectl proxy`.
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8001";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by the Kubernetes API client.
#[derive(Debug, Error)]
pub enum KubeError {
    /// The API server answered with a non-success status.
    #[error("API error {status}: {reason}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Reason reported by the API server.
        reason: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// In-cluster configuration is incomplete.
    #[error("invalid cluster configuration: {message}")]
    Config {
        /// What is missing or malformed.
        message: String,
    },
}

/// Anything that can list the pods of a namespace.
#[async_trait]
pub trait PodSource: Send + Sync {
    /// Lists the pods of `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request or is unreachable.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, KubeError>;
}

/// HTTP client bound to one API server.
#[derive(Debug, Clone)]
pub struct KubeClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl KubeClient {
    /// Creates a client for `base_url` without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, KubeError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http,
        })
    }

    /// Loads the in-cluster configuration from the service account mount
    /// and the `KUBERNETES_SERVICE_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error when not running inside a pod.
    pub fn in_cluster() -> Result<Self, KubeError> {
        let host = require_env("KUBERNETES_SERVICE_HOST").map_err(|e| KubeError::Config {
            message: e.to_string(),
        })?;
        let port = env_or("KUBERNETES_SERVICE_PORT", "443");
        Self::from_service_account(&host, &port, Path::new(SERVICE_ACCOUNT_DIR))
    }

    /// Builds a client from a service account directory holding `token`
    /// and `ca.crt`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be read or parsed.
    pub fn from_service_account(host: &str, port: &str, dir: &Path) -> Result<Self, KubeError> {
        let read = |name: &str| {
            std::fs::read(dir.join(name)).map_err(|e| KubeError::Config {
                message: format!("cannot read {}: {e}", dir.join(name).display()),
            })
        };
        let token = String::from_utf8_lossy(&read("token")?).trim().to_string();
        let ca = reqwest::Certificate::from_pem(&read("ca.crt")?)?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .add_root_certificate(ca)
            .build()?;

        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Ok(Self {
            base_url: format!("https://{host}:{port}"),
            token: Some(token),
            http,
        })
    }

    /// Uses the in-cluster configuration when available, otherwise
    /// `fallback_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither configuration yields a client.
    pub fn in_cluster_or(fallback_url: &str) -> Result<Self, KubeError> {
        match Self::in_cluster() {
            Ok(client) => {
                tracing::info!("Loaded in-cluster Kubernetes config");
                Ok(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, url = fallback_url, "Not running in cluster, using local API proxy");
                Self::new(fallback_url)
            }
        }
    }

    /// Returns the API server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PodSource for KubeClient {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, KubeError> {
        let url = format!("{}/api/v1/namespaces/{namespace}/pods", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("Unknown").to_string();
            let reason = response
                .json::<ApiStatus>()
                .await
                .ok()
                .and_then(|s| s.reason)
                .unwrap_or(fallback);
            return Err(KubeError::Api {
                status: status.as_u16(),
                reason,
            });
        }

        let list: PodList = response.json().await?;
        Ok(list.items)
    }
}

/// `Status` object returned by the API server on errors.
#[derive(Debug, Deserialize)]
struct ApiStatus {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

/// The subset of a `Pod` object the monitor reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pod {
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: PodSpec,
    /// Observed state.
    #[serde(default)]
    pub status: PodStatus,
}

/// Object metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default)]
    pub name: String,
    /// When the object was created.
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Pod spec.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers declared in the pod.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Node the pod is scheduled on.
    pub node_name: Option<String>,
}

/// Container declaration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Container {
    /// Container name.
    #[serde(default)]
    pub name: String,
}

/// Pod status.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    /// Lifecycle phase (`Pending`, `Running`, ...).
    pub phase: Option<String>,
    /// Per-container status.
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

/// Per-container status.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    /// Whether the container passes its readiness probe.
    #[serde(default)]
    pub ready: bool,
    /// How many times the container has been restarted.
    #[serde(default)]
    pub restart_count: u32,
}
