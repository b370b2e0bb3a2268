//! Build every scenario image and push both of its tags.

use std::io::Write;
use std::path::Path;

use crate::catalog::{ImageSettings, ScenarioImage};
use crate::check::{ensure_login, require_daemon};
use crate::error::Result;
use crate::report::{Reporter, Summary};
use crate::toolchain::Toolchain;

/// Builds and pushes `scenarios` from the contexts under `root`.
///
/// A failed build skips the push; a failed versioned push skips the
/// `latest` push. Every scenario is attempted.
///
/// # Errors
///
/// Returns an error if Docker is not running or the output cannot be
/// written. Per-image failures are reported in the [`Summary`].
pub fn build_and_push(
    toolchain: &dyn Toolchain,
    out: &mut dyn Write,
    root: &Path,
    settings: &ImageSettings,
    scenarios: &[ScenarioImage],
) -> Result<Summary> {
    let mut reporter = Reporter::new(out);
    reporter.header("K8s Workshop - Build and Push All Images")?;
    reporter.line(&format!("Docker User: {}", settings.user))?;
    reporter.line(&format!("Version: {}", settings.version))?;
    reporter.line(&format!("Total Images: {}", scenarios.len()))?;

    reporter.header("Checking Prerequisites")?;
    require_daemon(toolchain, &mut reporter)?;
    ensure_login(toolchain, &mut reporter, &settings.user)?;

    reporter.header("Building and Pushing Images")?;
    let mut summary = Summary {
        total: scenarios.len(),
        ..Summary::default()
    };

    for (index, scenario) in scenarios.iter().enumerate() {
        reporter.progress(index + 1, scenarios.len(), scenario.name)?;

        if !build_image(toolchain, &mut reporter, root, settings, scenario)? {
            summary.failed.push(scenario.name.to_string());
            reporter.line(&format!(
                "⚠️  Skipping push for {} due to build failure\n",
                scenario.name
            ))?;
            continue;
        }

        if !push_image(toolchain, &mut reporter, settings, scenario)? {
            summary.failed.push(scenario.name.to_string());
            reporter.line(&format!("⚠️  Push failed for {}\n", scenario.name))?;
            continue;
        }

        summary.succeeded += 1;
        tracing::info!(scenario = scenario.name, "image built and pushed");
        reporter.line(&format!("✅ Successfully built and pushed {}\n", scenario.name))?;
    }

    reporter.summary("Build Summary", &summary, "Failed scenarios")?;
    if summary.is_success() {
        reporter.line("\n🎉 All images built and pushed successfully!")?;
        reporter.line("\nImages are now available at:")?;
        for scenario in scenarios {
            reporter.line(&format!("  {}", settings.published(scenario)))?;
        }
        reporter.line("\n✅ Ready to test on Kubernetes!")?;
    }
    Ok(summary)
}

fn build_image(
    toolchain: &dyn Toolchain,
    reporter: &mut Reporter<'_>,
    root: &Path,
    settings: &ImageSettings,
    scenario: &ScenarioImage,
) -> Result<bool> {
    let context = scenario.context_dir(root);
    if !context.is_dir() {
        reporter.line(&format!("❌ Directory not found: {}", context.display()))?;
        return Ok(false);
    }

    let versioned = settings.versioned(scenario).to_string();
    let latest = settings.latest(scenario).to_string();
    let context = context.display().to_string();
    reporter.step(
        toolchain,
        &["build", "-t", &versioned, "-t", &latest, &context],
        &format!("Building {}", scenario.name),
    )
}

fn push_image(
    toolchain: &dyn Toolchain,
    reporter: &mut Reporter<'_>,
    settings: &ImageSettings,
    scenario: &ScenarioImage,
) -> Result<bool> {
    for image in [settings.versioned(scenario), settings.latest(scenario)] {
        let reference = image.to_string();
        let description = format!("Pushing {}:{}", scenario.name, image.tag());
        if !reporter.step(toolchain, &["push", &reference], &description)? {
            return Ok(false);
        }
    }
    Ok(true)
}
