//! `kubelab init-wait` — Poll Redis until it answers PING.

use std::time::Duration;

use clap::Args;
use kubelab_common::constants::{DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT};
use kubelab_scenarios::init_wait::{
    self, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS, InitWaitConfig, WaitPolicy,
};

/// Arguments for the `init-wait` command.
#[derive(Args, Debug)]
pub struct InitWaitArgs {
    /// Redis host.
    #[arg(long, env = "REDIS_HOST", default_value = DEFAULT_REDIS_HOST)]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, env = "REDIS_PORT", default_value_t = DEFAULT_REDIS_PORT)]
    pub redis_port: u16,

    /// Seconds between attempts.
    #[arg(long, env = "WAIT_INTERVAL", default_value_t = DEFAULT_INTERVAL.as_secs())]
    pub interval_secs: u64,

    /// Attempts before giving up (0 waits forever).
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl From<InitWaitArgs> for InitWaitConfig {
    fn from(args: InitWaitArgs) -> Self {
        Self {
            host: args.redis_host,
            port: args.redis_port,
            policy: WaitPolicy {
                interval: Duration::from_secs(args.interval_secs),
                max_attempts: args.max_attempts,
            },
        }
    }
}

/// Executes the `init-wait` command.
///
/// # Errors
///
/// Returns an error, and so exit status 1, when Redis never became ready.
pub fn execute(args: InitWaitArgs) -> anyhow::Result<()> {
    let config = InitWaitConfig::from(args);
    super::block_on(init_wait::run(&config))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Command};
    use clap::Parser;

    #[test]
    fn flags_map_to_policy() {
        let cli = Cli::try_parse_from([
            "kubelab",
            "init-wait",
            "--redis-host",
            "redis-service",
            "--interval-secs",
            "5",
            "--max-attempts",
            "0",
        ])
        .unwrap();
        let Command::InitWait(args) = cli.command else {
            panic!("expected init-wait");
        };
        let config = InitWaitConfig::from(args);
        assert_eq!(config.host, "redis-service");
        assert_eq!(config.policy.interval, Duration::from_secs(5));
        assert_eq!(config.policy.max_attempts, 0);
    }
}
