//! Domain primitive types used across the kubelab workspace.

use std::fmt;

use serde::Serialize;

use crate::constants::UNKNOWN_POD;

/// Fully qualified reference to a container image tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    repository: String,
    tag: String,
}

impl ImageRef {
    /// Creates an image reference from a repository and tag.
    #[must_use]
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Builds the reference of a workshop scenario image,
    /// `<user>/<prefix>-<name>:<tag>`.
    #[must_use]
    pub fn for_scenario(user: &str, prefix: &str, name: &str, tag: &str) -> Self {
        Self::new(format!("{user}/{prefix}-{name}"), tag)
    }

    /// Returns the repository part (everything before the colon).
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the tag part.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the same repository with a different tag.
    #[must_use]
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self::new(self.repository.clone(), tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Name of the pod a scenario runs in, as injected through `HOSTNAME`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PodName(String);

impl PodName {
    /// Creates a pod name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Uses the given value, falling back to `"unknown"` when absent.
    #[must_use]
    pub fn from_option(name: Option<String>) -> Self {
        Self(name.unwrap_or_else(|| UNKNOWN_POD.to_string()))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PodName {
    fn default() -> Self {
        Self::new(UNKNOWN_POD)
    }
}

impl fmt::Display for PodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_image_ref_follows_hub_layout() {
        let image = ImageRef::for_scenario("vellankikoti", "k8s-masterclass", "crashloop", "v1.0");
        assert_eq!(image.to_string(), "vellankikoti/k8s-masterclass-crashloop:v1.0");
        assert_eq!(image.repository(), "vellankikoti/k8s-masterclass-crashloop");
    }

    #[test]
    fn with_tag_keeps_repository() {
        let image = ImageRef::new("acme/web", "v1.0").with_tag("latest");
        assert_eq!(image.to_string(), "acme/web:latest");
    }

    #[test]
    fn pod_name_defaults_to_unknown() {
        assert_eq!(PodName::from_option(None).as_str(), "unknown");
        assert_eq!(PodName::default().as_str(), "unknown");
    }

    #[test]
    fn pod_name_serializes_as_plain_string() {
        let json = serde_json::to_string(&PodName::new("web-7d9f")).expect("serialize");
        assert_eq!(json, "\"web-7d9f\"");
    }
}
