//! Workspace-wide constants and default paths.

/// Docker Hub account that owns the workshop images.
pub const DOCKER_USER: &str = "vellankikoti";

/// Version tag applied to every workshop image alongside `latest`.
pub const IMAGE_VERSION: &str = "v1.0";

/// Prefix shared by every workshop image repository.
pub const REPO_PREFIX: &str = "k8s-masterclass";

/// Moving tag pushed and pulled next to [`IMAGE_VERSION`].
pub const LATEST_TAG: &str = "latest";

/// Port every scenario listens on unless overridden.
pub const DEFAULT_PORT: u16 = 5000;

/// Pod name reported when `HOSTNAME` is not set.
pub const UNKNOWN_POD: &str = "unknown";

/// Where the blog scenario expects its ConfigMap to be mounted.
pub const DEFAULT_BLOG_CONFIG: &str = "/config/blog.json";

/// Mount point of the persistent volume in the storage scenario.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Redis host used by the todo app and its init container.
pub const DEFAULT_REDIS_HOST: &str = "localhost";

/// Redis port used by the todo app and its init container.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Service name the order frontend resolves the inventory backend by.
pub const DEFAULT_INVENTORY_SERVICE: &str = "inventory-service";

/// Namespace the pod monitor lists when `NAMESPACE` is unset.
pub const DEFAULT_NAMESPACE: &str = "default";
