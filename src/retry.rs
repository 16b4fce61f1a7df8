//! Jittered exponential backoff for startup calls
//!
//! CRD installation and ClusterImageSet creation run before any controller
//! starts and the API server may not be reachable yet. They are retried here
//! rather than failing the process on the first refused connection.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// How a fallible startup call is retried
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Attempts before giving up; 0 retries forever
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied after each failure
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy used for calls made while the simulator starts up
    pub fn startup() -> Self {
        Self {
            max_attempts: 10,
            ..Self::default()
        }
    }

    /// Same policy, limited to `attempts`
    pub fn attempts(self, attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..self
        }
    }

    /// Un-jittered delay after the `attempt`-th failure (1-based), capped
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts > 0 && attempt >= self.max_attempts
    }
}

/// Scale `delay` by a random factor in `[0.5, 1.5)`
fn jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.5..1.5);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}

/// Run `operation` until it succeeds or the policy gives up
///
/// Returns the last error once `max_attempts` is reached.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, what: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if policy.exhausted(attempt) {
            error!(operation = %what, attempt, error = %err, "giving up");
            return Err(err);
        }

        let delay = jitter(policy.base_delay(attempt));
        warn!(
            operation = %what,
            attempt,
            error = %err,
            delay_ms = delay.as_millis() as u64,
            "retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
