//! `kubelab crashloop` — Worker that exits when `REQUIRED_CONFIG` is missing.

use std::time::Duration;

use clap::Args;
use kubelab_scenarios::crashloop::{self, CrashloopConfig, REQUIRED_CONFIG_KEY};

/// Arguments for the `crashloop` command.
#[derive(Args, Debug)]
pub struct CrashloopArgs {
    /// Configuration value the worker refuses to start without.
    #[arg(long, env = REQUIRED_CONFIG_KEY)]
    pub required_config: Option<String>,

    /// Seconds between heartbeats.
    #[arg(long, default_value_t = crashloop::HEARTBEAT_INTERVAL.as_secs())]
    pub heartbeat_secs: u64,
}

impl CrashloopArgs {
    fn config(self) -> CrashloopConfig {
        CrashloopConfig {
            required_config: self.required_config,
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs.max(1)),
        }
    }
}

/// Executes the `crashloop` command.
///
/// # Errors
///
/// Returns an error, and so exit status 1, when the configuration is missing.
pub fn execute(args: CrashloopArgs) -> anyhow::Result<()> {
    super::block_on(crashloop::run(args.config()))??;
    Ok(())
}
