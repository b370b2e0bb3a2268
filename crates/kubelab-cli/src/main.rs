//! # kubelab — Kubernetes failure-mode workshop
//!
//! One binary for every scenario app and the image utilities.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;
mod logging;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_format)?;
    commands::execute(cli)
}
