//! Pre-pull every scenario image so the workshop runs offline.

use std::io::Write;

use kubelab_common::constants::LATEST_TAG;

use crate::catalog::{ImageSettings, ScenarioImage};
use crate::check::{report_platform, require_daemon};
use crate::error::Result;
use crate::report::{Reporter, Summary};
use crate::toolchain::Toolchain;

/// Pulls the versioned and `latest` tag of each scenario.
///
/// A failed versioned pull is recorded but the `latest` pull is still
/// tried; a scenario counts as pulled when its `latest` tag arrived.
///
/// # Errors
///
/// Returns an error if Docker is not running or the output cannot be
/// written. Per-image failures are reported in the [`Summary`].
pub fn pull_all(
    toolchain: &dyn Toolchain,
    out: &mut dyn Write,
    settings: &ImageSettings,
    scenarios: &[ScenarioImage],
) -> Result<Summary> {
    let mut reporter = Reporter::new(out);
    reporter.header("K8s Workshop - Pull All Images")?;
    reporter.line(&format!("Docker User: {}", settings.user))?;
    reporter.line(&format!("Version: {}", settings.version))?;
    reporter.line(&format!("Total Images: {}", scenarios.len()))?;
    reporter.line("\nℹ️  All images are multi-platform (linux/amd64, linux/arm64)")?;
    reporter.line("   Docker will automatically pull the correct version for your system\n")?;

    reporter.header("Checking Prerequisites")?;
    require_daemon(toolchain, &mut reporter)?;
    report_platform(toolchain, &mut reporter)?;

    reporter.header("Pulling Images from Docker Hub")?;
    let mut summary = Summary {
        total: scenarios.len(),
        ..Summary::default()
    };

    for (index, scenario) in scenarios.iter().enumerate() {
        reporter.progress(index + 1, scenarios.len(), scenario.name)?;

        let versioned = settings.versioned(scenario);
        if !pull_image(toolchain, &mut reporter, scenario, &versioned.to_string(), versioned.tag())? {
            summary.failed.push(format!("{}:{}", scenario.name, versioned.tag()));
            reporter.line(&format!("⚠️  Failed to pull {}:{}\n", scenario.name, versioned.tag()))?;
        }

        let latest = settings.latest(scenario).to_string();
        if !pull_image(toolchain, &mut reporter, scenario, &latest, LATEST_TAG)? {
            summary.failed.push(format!("{}:{LATEST_TAG}", scenario.name));
            reporter.line(&format!("⚠️  Failed to pull {}:{LATEST_TAG}\n", scenario.name))?;
            continue;
        }

        summary.succeeded += 1;
        tracing::info!(scenario = scenario.name, "image pulled");
        reporter.line(&format!("✅ Successfully pulled {}\n", scenario.name))?;
    }

    reporter.summary("Pull Summary", &summary, "Failed images")?;
    if summary.is_success() {
        reporter.line("\n🎉 All images pulled successfully!")?;
        reporter.line("\nImages are now available locally:")?;
        for scenario in scenarios {
            reporter.line(&format!("  {}", settings.published(scenario)))?;
        }
        reporter.line("\n✅ Ready to use with Kubernetes!")?;
        reporter.line(&format!(
            "\nTo verify, run: docker images | grep {}",
            settings.prefix
        ))?;
    } else {
        reporter.line("\n⚠️  Some images failed to pull. Common reasons:")?;
        reporter.line("  1. Images don't exist on Docker Hub")?;
        reporter.line("  2. Network connectivity issues")?;
        reporter.line("  3. Images not built with multi-platform support")?;
        reporter.line("\nℹ️  Run `kubelab images build-push` to build and push images")?;
    }
    Ok(summary)
}

fn pull_image(
    toolchain: &dyn Toolchain,
    reporter: &mut Reporter<'_>,
    scenario: &ScenarioImage,
    reference: &str,
    tag: &str,
) -> Result<bool> {
    reporter.step(
        toolchain,
        &["pull", reference],
        &format!("Pulling {}:{tag}", scenario.name),
    )
}
