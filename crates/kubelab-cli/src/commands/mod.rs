//! CLI command definitions and dispatch.

pub mod crashloop;
pub mod images;
pub mod init_wait;
pub mod scenarios;
pub mod serve;

use std::future::Future;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// kubelab — Kubernetes failure-mode workshop apps and image tooling.
#[derive(Parser, Debug)]
#[command(name = "kubelab", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log line format.
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one of the HTTP scenario apps.
    Serve(serve::ServeArgs),
    /// Run the worker that crash-loops without its configuration.
    Crashloop(crashloop::CrashloopArgs),
    /// Block until Redis answers (init container).
    InitWait(init_wait::InitWaitArgs),
    /// Build, push or pull the workshop images.
    Images(images::ImagesArgs),
    /// List the scenarios and their images.
    Scenarios(scenarios::ScenariosArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve::execute(args),
        Command::Crashloop(args) => crashloop::execute(args),
        Command::InitWait(args) => init_wait::execute(args),
        Command::Images(args) => images::execute(args),
        Command::Scenarios(args) => scenarios::execute(&args),
    }
}

/// Runs `future` to completion on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_format_defaults_to_text() {
        let cli = Cli::try_parse_from(["kubelab", "scenarios"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["kubelab", "scenarios", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
