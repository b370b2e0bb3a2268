//! Error type for the image workflows.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an image workflow.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The docker binary is not on `PATH`.
    #[error("docker not found on PATH; install Docker and try again")]
    DockerNotFound,

    /// `docker version` failed, so the daemon is not reachable.
    #[error("Docker is not running or not installed: {stderr}")]
    DockerNotRunning {
        /// What docker printed on stderr.
        stderr: String,
    },

    /// A docker process could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Progress output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ImageError>;
