//! Tracing subscriber setup.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact single-line text.
    #[default]
    Text,
    /// Multi-line, human-friendly output.
    Pretty,
    /// JSON lines for log collectors.
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
///
/// Warnings and errors go to stderr, everything else to stdout.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);

    let result = match format {
        LogFormat::Text => registry.with(layer.with_target(false)).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize {format:?} tracing subscriber: {e}"))
}
