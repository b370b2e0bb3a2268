//! Init-container scenario, init side.
//!
//! Polls Redis with PING until it answers. The main container only starts
//! once this exits 0; if Redis never comes up the pod sits in `Init`.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::ScenarioError;

/// Default pause between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How often and how long to keep probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Pause between failed attempts.
    pub interval: Duration,
    /// Attempts before giving up; `0` waits forever.
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Target and policy for the init container.
#[derive(Debug, Clone)]
pub struct InitWaitConfig {
    /// Redis host.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// Retry policy.
    pub policy: WaitPolicy,
}

/// Calls `probe` until it succeeds or the attempt budget runs out.
///
/// Returns the number of the successful attempt.
///
/// # Errors
///
/// Returns the last probe error once `max_attempts` attempts have failed.
pub async fn wait_for<F, Fut>(policy: WaitPolicy, mut probe: F) -> Result<u32, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match probe().await {
            Ok(()) => return Ok(attempt),
            Err(e) => {
                if policy.max_attempts != 0 && attempt >= policy.max_attempts {
                    return Err(e);
                }
                tracing::info!(attempt, error = %e, "not ready yet, retrying in {:?}", policy.interval);
            }
        }
        tokio::time::sleep(policy.interval).await;
    }
}

/// Opens a connection to Redis and sends one PING.
///
/// # Errors
///
/// Returns a description of the connection or protocol failure.
pub async fn redis_probe(host: &str, port: u16) -> Result<(), String> {
    let client = redis::Client::open(format!("redis://{host}:{port}/")).map_err(|e| e.to_string())?;
    let attempt = async {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok::<(), redis::RedisError>(())
    };
    match timeout(PROBE_TIMEOUT, attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {PROBE_TIMEOUT:?}")),
    }
}

/// Waits for Redis as configured.
///
/// # Errors
///
/// Returns `Unavailable` when Redis never answered; the caller turns it
/// into exit status 1.
pub async fn run(config: &InitWaitConfig) -> Result<(), ScenarioError> {
    let host = config.host.as_str();
    let port = config.port;
    let policy = config.policy;
    tracing::info!(host, port, max_attempts = policy.max_attempts, "Waiting for Redis at {host}:{port}");

    match wait_for(policy, move || redis_probe(host, port)).await {
        Ok(attempt) => {
            tracing::info!(attempt, "Redis is ready");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Redis did not become ready");
            Err(ScenarioError::Unavailable(format!(
                "redis at {host}:{port} not ready after {} attempts: {e}",
                policy.max_attempts
            )))
        }
    }
}
