use std::fmt::Display;
use std::future::Future;

use stockrelay_core::config::BrokerConfig;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::error::{BrokerError, Result};

/// Bounded retry schedule for broker connections.
///
/// The delay is fixed: the broker usually comes up a few seconds after the
/// relay in a compose stack, and a steady poll finds it sooner than a
/// growing backoff would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Worst-case time spent before giving up.
    pub fn ceiling(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

impl From<&BrokerConfig> for RetryPolicy {
    fn from(cfg: &BrokerConfig) -> Self {
        Self::new(cfg.max_retries, Duration::from_secs(cfg.retry_delay_secs))
    }
}

/// Run `attempt` until it succeeds or the policy's budget is spent.
///
/// Schedule: attempt → delay → attempt → … up to `max_attempts` tries.
/// The last failure is returned as [`BrokerError::Exhausted`].
pub async fn connect_with_retry<T, E, F, Fut>(
    target: &str,
    policy: RetryPolicy,
    mut attempt: F,
) -> Result<T>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let max = policy.max_attempts.max(1);
    let mut n = 1;

    loop {
        info!(target, attempt = n, max, "connecting to broker");
        match attempt().await {
            Ok(value) => {
                info!(target, attempt = n, "broker connected");
                return Ok(value);
            }
            Err(e) if n >= max => {
                error!(target, attempts = max, error = %e, "broker unreachable, giving up");
                return Err(BrokerError::Exhausted {
                    attempts: max,
                    last_error: e.to_string(),
                });
            }
            Err(e) => {
                warn!(
                    target,
                    attempt = n,
                    max,
                    error = %e,
                    retry_after_secs = policy.delay.as_secs(),
                    "broker connect failed, retrying"
                );
                sleep(policy.delay).await;
                n += 1;
            }
        }
    }
}
