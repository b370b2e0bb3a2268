//! The container CLI the workflows drive.
//!
//! [`Toolchain`] is the seam: [`DockerCli`] shells out to the real binary,
//! tests substitute a recording fake.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{ImageError, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    /// Everything written to stdout.
    pub stdout: String,
    /// Everything written to stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// A successful result with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given stderr.
    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Something that can run container CLI subcommands.
pub trait Toolchain {
    /// Runs `args` with output captured.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process could not be started; a
    /// non-zero exit is reported through [`CommandOutput::success`].
    fn run(&self, args: &[&str]) -> Result<CommandOutput>;

    /// Runs `args` attached to the terminal (for prompts such as login).
    ///
    /// # Errors
    ///
    /// Returns an error if the process could not be started.
    fn run_interactive(&self, args: &[&str]) -> Result<bool>;
}

/// The `docker` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
}

impl DockerCli {
    /// Locates `docker` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::DockerNotFound`] if it is not installed.
    pub fn locate() -> Result<Self> {
        which::which("docker")
            .map(Self::with_binary)
            .map_err(|_| ImageError::DockerNotFound)
    }

    /// Uses an explicit binary path.
    #[must_use]
    pub const fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Path of the binary in use.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn spawn_error(&self, source: std::io::Error) -> ImageError {
        ImageError::Spawn {
            program: self.binary.clone(),
            source,
        }
    }
}

impl Toolchain for DockerCli {
    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        tracing::debug!(binary = %self.binary.display(), ?args, "running docker");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_interactive(&self, args: &[&str]) -> Result<bool> {
        tracing::debug!(binary = %self.binary.display(), ?args, "running docker interactively");
        let status = Command::new(&self.binary)
            .args(args)
            .status()
            .map_err(|e| self.spawn_error(e))?;
        Ok(status.success())
    }
}
