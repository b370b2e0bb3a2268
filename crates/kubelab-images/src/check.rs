//! Prerequisite checks run before any image work.

use crate::error::{ImageError, Result};
use crate::report::Reporter;
use crate::toolchain::Toolchain;

/// Fails unless `docker version` succeeds.
///
/// # Errors
///
/// Returns [`ImageError::DockerNotRunning`] when the daemon is unreachable.
pub fn require_daemon(toolchain: &dyn Toolchain, reporter: &mut Reporter<'_>) -> Result<()> {
    let result = toolchain.run(&["version"]);
    match result {
        Ok(output) if output.success => {
            reporter.line("✅ Docker is running")?;
            Ok(())
        }
        other => {
            reporter.line("❌ Docker is not running or not installed")?;
            reporter.line("Please start Docker and try again")?;
            let stderr = match other {
                Ok(output) => output.stderr.trim().to_string(),
                Err(e) => e.to_string(),
            };
            Err(ImageError::DockerNotRunning { stderr })
        }
    }
}

/// Makes sure pushes will be authenticated as `user`.
///
/// `docker info` names the logged-in account; when it is not `user` an
/// interactive `docker login -u <user>` is attempted. Problems here are
/// only warnings, the push itself will fail loudly if credentials are
/// missing.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn ensure_login(toolchain: &dyn Toolchain, reporter: &mut Reporter<'_>, user: &str) -> Result<()> {
    let verified = match toolchain.run(&["info"]) {
        Ok(info) if info.success => {
            if info.stdout.contains(user) {
                reporter.line(&format!("✅ Logged in to Docker Hub as {user}"))?;
                true
            } else {
                reporter.line(&format!("\n⚠️  Not logged in to Docker Hub as {user}"))?;
                reporter.line("Attempting to log in...")?;
                toolchain
                    .run_interactive(&["login", "-u", user])
                    .unwrap_or(false)
            }
        }
        _ => false,
    };
    if !verified {
        tracing::warn!(user, "docker hub login not verified");
        reporter.line("⚠️  Could not verify Docker Hub login")?;
        reporter.line(&format!("You may need to run: docker login -u {user}"))?;
    }
    Ok(())
}

/// Reports the daemon's `os/arch`, or a warning if it cannot be read.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn report_platform(toolchain: &dyn Toolchain, reporter: &mut Reporter<'_>) -> Result<()> {
    match toolchain.run(&["version", "--format", "{{.Server.Os}}/{{.Server.Arch}}"]) {
        Ok(output) if output.success => {
            reporter.line(&format!("✅ Docker platform: {}", output.stdout.trim()))?;
            reporter.line("   (Multi-platform images support linux/amd64 and linux/arm64)")?;
        }
        _ => reporter.line("⚠️  Could not detect platform, but will continue")?,
    }
    Ok(())
}
