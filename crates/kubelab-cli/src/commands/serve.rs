//! `kubelab serve` — Run one HTTP scenario app.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::{Args, Subcommand};
use kubelab_common::constants::{
    DEFAULT_BLOG_CONFIG, DEFAULT_DATA_DIR, DEFAULT_INVENTORY_SERVICE, DEFAULT_NAMESPACE,
    DEFAULT_PORT, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT,
};
use kubelab_common::types::PodName;
use kubelab_scenarios::blog::{self, BlogState};
use kubelab_scenarios::health::{self, HealthState};
use kubelab_scenarios::inventory::{self, InventoryState, seed_inventory};
use kubelab_scenarios::kube::{DEFAULT_PROXY_URL, KubeClient};
use kubelab_scenarios::memory_hog::{self, MemoryHogState};
use kubelab_scenarios::orders::{self, OrdersState};
use kubelab_scenarios::pod_monitor::{self, PodMonitorState};
use kubelab_scenarios::server;
use kubelab_scenarios::storage::{self, StorageState};
use kubelab_scenarios::todo::{self, TodoState};
use kubelab_scenarios::webapp::{self, WebappState};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Pod name shown on pages; Kubernetes sets `HOSTNAME` to it.
    #[arg(long, env = "HOSTNAME", global = true)]
    pub pod_name: Option<String>,

    /// Scenario to run.
    #[command(subcommand)]
    pub scenario: Scenario,
}

/// The HTTP scenario apps. Aliases match the image names.
#[derive(Subcommand, Debug)]
pub enum Scenario {
    /// Web app reached through a Service with the wrong target port.
    Webapp,
    /// Blog that needs its ConfigMap mounted.
    #[command(alias = "config-app")]
    Blog(BlogArgs),
    /// Pod dashboard whose ServiceAccount lacks RBAC rights.
    #[command(alias = "rbac-app")]
    PodMonitor(PodMonitorArgs),
    /// Image processor that grows until it is OOMKilled.
    MemoryHog,
    /// API with slow readiness and a kill switch for liveness.
    #[command(alias = "health-app")]
    Health(HealthArgs),
    /// Inventory backend behind a NetworkPolicy.
    #[command(alias = "netpol-server")]
    Inventory,
    /// Order frontend calling the inventory backend.
    #[command(alias = "netpol-client")]
    Orders(OrdersArgs),
    /// Upload service writing to a PersistentVolumeClaim.
    #[command(alias = "storage-app")]
    Storage(StorageArgs),
    /// Todo list that needs Redis, started after an init container.
    #[command(alias = "init-app")]
    Todo(RedisArgs),
}

impl Scenario {
    /// Name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Webapp => "webapp",
            Self::Blog(_) => "blog",
            Self::PodMonitor(_) => "pod-monitor",
            Self::MemoryHog => "memory-hog",
            Self::Health(_) => "health",
            Self::Inventory => "inventory",
            Self::Orders(_) => "orders",
            Self::Storage(_) => "storage",
            Self::Todo(_) => "todo",
        }
    }
}

/// Blog settings.
#[derive(Args, Debug)]
pub struct BlogArgs {
    /// Mounted JSON configuration file.
    #[arg(long, env = "CONFIG_PATH", default_value = DEFAULT_BLOG_CONFIG)]
    pub config_path: PathBuf,
}

/// Pod monitor settings.
#[derive(Args, Debug)]
pub struct PodMonitorArgs {
    /// Namespace whose pods are listed.
    #[arg(long, env = "NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// API server URL used outside a cluster.
    #[arg(long, env = "KUBE_API_URL", default_value = DEFAULT_PROXY_URL)]
    pub kube_api_url: String,
}

/// Probe scenario settings.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Seconds before the app reports ready.
    #[arg(long, env = "STARTUP_DELAY", default_value_t = health::STARTUP_DELAY.as_secs())]
    pub startup_delay: u64,
}

/// Order frontend settings.
#[derive(Args, Debug)]
pub struct OrdersArgs {
    /// Service name of the inventory backend.
    #[arg(long, env = "INVENTORY_SERVICE", default_value = DEFAULT_INVENTORY_SERVICE)]
    pub inventory_service: String,

    /// Full inventory URL, overriding the service name.
    #[arg(long, env = "INVENTORY_URL")]
    pub inventory_url: Option<String>,
}

impl OrdersArgs {
    fn url(&self) -> String {
        self.inventory_url
            .clone()
            .unwrap_or_else(|| orders::inventory_url(&self.inventory_service))
    }
}

/// Storage settings.
#[derive(Args, Debug)]
pub struct StorageArgs {
    /// Mount point of the persistent volume.
    #[arg(long, env = "DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,
}

/// Redis connection settings.
#[derive(Args, Debug)]
pub struct RedisArgs {
    /// Redis host.
    #[arg(long, env = "REDIS_HOST", default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, env = "REDIS_PORT", default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,
}

/// Executes the `serve` command.
///
/// # Errors
///
/// Returns an error if the scenario cannot start (missing ConfigMap,
/// unwritable volume, port in use) or the server fails.
pub fn execute(args: ServeArgs) -> anyhow::Result<()> {
    super::block_on(run(args))?
}

async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let pod = PodName::from_option(args.pod_name);
    let name = args.scenario.name();
    tracing::info!(scenario = name, pod = %pod, port = args.port, "starting scenario");

    let router = build_router(args.scenario, pod, args.port).await?;
    server::serve(router, args.port, name).await?;
    Ok(())
}

async fn build_router(scenario: Scenario, pod: PodName, port: u16) -> anyhow::Result<Router> {
    Ok(match scenario {
        Scenario::Webapp => {
            tracing::info!("Starting web application on port {port}");
            webapp::router(WebappState { pod })
        }
        Scenario::Blog(args) => {
            let config = blog::load_config(&args.config_path)?;
            blog::router(BlogState {
                config: Arc::new(config),
                pod,
            })
        }
        Scenario::PodMonitor(args) => {
            let client = KubeClient::in_cluster_or(&args.kube_api_url)?;
            tracing::info!(namespace = %args.namespace, api = client.base_url(), "monitoring pods");
            pod_monitor::router(PodMonitorState {
                source: Arc::new(client),
                namespace: args.namespace,
                pod,
            })
        }
        Scenario::MemoryHog => memory_hog::router(MemoryHogState::new()),
        Scenario::Health(args) => {
            health::router(HealthState::new(Duration::from_secs(args.startup_delay), pod))
        }
        Scenario::Inventory => inventory::router(InventoryState::new(seed_inventory(), pod)),
        Scenario::Orders(args) => {
            let url = args.url();
            tracing::info!(inventory = %url, "using inventory service");
            orders::router(OrdersState::new(url, pod)?)
        }
        Scenario::Storage(args) => {
            tracing::info!(data_dir = %args.data_dir.display(), "using data directory");
            storage::router(StorageState::open(&args.data_dir, pod)?)
        }
        Scenario::Todo(args) => {
            todo::router(TodoState::connect(&args.redis_host, args.redis_port, pod).await)
        }
    })
}
