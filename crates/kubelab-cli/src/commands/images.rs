//! `kubelab images` — Build, push and pull the workshop images.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use kubelab_common::constants::{DOCKER_USER, IMAGE_VERSION, REPO_PREFIX};
use kubelab_images::catalog::{ImageSettings, SCENARIOS};
use kubelab_images::report::Summary;
use kubelab_images::toolchain::DockerCli;
use kubelab_images::{build, pull};

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Registry account that owns the images.
    #[arg(long, env = "DOCKER_USER", default_value = DOCKER_USER, global = true)]
    pub user: String,

    /// Version tag used next to `latest`.
    #[arg(long, env = "IMAGE_VERSION", default_value = IMAGE_VERSION, global = true)]
    pub image_version: String,

    /// Repository name prefix.
    #[arg(long, default_value = REPO_PREFIX, global = true)]
    pub prefix: String,

    /// Image operation.
    #[command(subcommand)]
    pub action: ImagesAction,
}

/// Image operations.
#[derive(Subcommand, Debug)]
pub enum ImagesAction {
    /// Build every scenario image and push both tags.
    BuildPush {
        /// Repository root containing `scenarios/`.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Pull every scenario image for offline use.
    Pull,
}

impl ImagesArgs {
    fn settings(&self) -> ImageSettings {
        ImageSettings {
            user: self.user.clone(),
            version: self.image_version.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if Docker is unavailable or any image failed.
pub fn execute(args: ImagesArgs) -> anyhow::Result<()> {
    let settings = args.settings();
    let docker = DockerCli::locate()?;
    let mut stdout = std::io::stdout().lock();

    let summary = match &args.action {
        ImagesAction::BuildPush { root } => {
            install_cancel_handler("Build")?;
            build::build_and_push(&docker, &mut stdout, root, &settings, SCENARIOS)?
        }
        ImagesAction::Pull => {
            install_cancel_handler("Pull")?;
            pull::pull_all(&docker, &mut stdout, &settings, SCENARIOS)?
        }
    };
    check_summary(&summary)
}

fn check_summary(summary: &Summary) -> anyhow::Result<()> {
    if summary.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} failed: {}",
            summary.failed.len(),
            summary.total,
            summary.failed.join(", ")
        ))
    }
}

/// Exits with status 1 on Ctrl+C, telling the user which run was cut short.
fn install_cancel_handler(operation: &'static str) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        #[allow(clippy::print_stderr)]
        eprintln!("\n\n⚠️  {operation} cancelled by user");
        std::process::exit(1);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))
}
