//! The scenario images and where their build contexts live.

use std::path::{Path, PathBuf};

use kubelab_common::constants::{DOCKER_USER, IMAGE_VERSION, LATEST_TAG, REPO_PREFIX};
use kubelab_common::types::ImageRef;

/// One scenario image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioImage {
    /// Short name, used in the repository name.
    pub name: &'static str,
    /// Build context relative to `<root>/scenarios/`.
    pub context: &'static str,
}

const fn image(name: &'static str, context: &'static str) -> ScenarioImage {
    ScenarioImage { name, context }
}

/// Every image the workshop uses, in build order.
pub const SCENARIOS: &[ScenarioImage] = &[
    image("crashloop", "01-crashloop-backoff/app"),
    image("webapp", "03-port-mismatch/app"),
    image("config-app", "04-missing-configmap/app"),
    image("rbac-app", "05-rbac-forbidden/app"),
    image("memory-hog", "06-oom-killed/app"),
    image("health-app", "07-probe-failure/app"),
    image("netpol-client", "08-network-policy/app-client"),
    image("netpol-server", "08-network-policy/app-server"),
    image("storage-app", "09-pvc-pending/app"),
    image("init-app", "10-init-container-failure/app"),
    image("init-wait", "10-init-container-failure/init-wait"),
    image("redis", "10-init-container-failure/redis"),
];

/// Looks up a scenario image by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static ScenarioImage> {
    SCENARIOS.iter().find(|s| s.name == name)
}

impl ScenarioImage {
    /// Absolute build context under the repository `root`.
    #[must_use]
    pub fn context_dir(&self, root: &Path) -> PathBuf {
        root.join("scenarios").join(self.context)
    }
}

/// Registry account, version tag and repository prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSettings {
    /// Docker Hub account.
    pub user: String,
    /// Version tag pushed next to `latest`.
    pub version: String,
    /// Repository name prefix.
    pub prefix: String,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            user: DOCKER_USER.to_string(),
            version: IMAGE_VERSION.to_string(),
            prefix: REPO_PREFIX.to_string(),
        }
    }
}

impl ImageSettings {
    /// The versioned reference of `scenario`.
    #[must_use]
    pub fn versioned(&self, scenario: &ScenarioImage) -> ImageRef {
        ImageRef::for_scenario(&self.user, &self.prefix, scenario.name, &self.version)
    }

    /// The `latest` reference of `scenario`.
    #[must_use]
    pub fn latest(&self, scenario: &ScenarioImage) -> ImageRef {
        self.versioned(scenario).with_tag(LATEST_TAG)
    }

    /// Where the versioned image is published, e.g. `docker.io/<user>/<prefix>-<name>:<version>`.
    #[must_use]
    pub fn published(&self, scenario: &ScenarioImage) -> String {
        format!("docker.io/{}", self.versioned(scenario))
    }
}
