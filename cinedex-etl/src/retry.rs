//! Retry-with-backoff for the pipeline's I/O edges.
//!
//! Every catalog page fetch, bulk submission, and provisioning call is
//! wrapped in [`retry`]: transient failures back off and try again
//! until the owning component's deadline elapses, at which point the
//! last error propagates and aborts the tick.

use std::{cmp, time::Duration};

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{EtlError, Result};

/// Exponential backoff with full jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: bool,
    num_failures: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: bool) -> Self {
        Self {
            initial,
            max,
            jitter,
            num_failures: 0,
        }
    }

    pub fn reset(&mut self) {
        self.num_failures = 0;
    }

    /// Record a failure and return how long to wait before the next
    /// attempt.
    pub fn fail(&mut self) -> Duration {
        let p = 2u32.checked_pow(self.num_failures).unwrap_or(u32::MAX);
        self.num_failures += 1;
        let raw = self.initial.checked_mul(p).unwrap_or(self.max);
        let capped = cmp::min(raw, self.max);
        if self.jitter {
            capped.mul_f32(rand::rng().random::<f32>())
        } else {
            capped
        }
    }

    pub fn failures(&self) -> u32 {
        self.num_failures
    }
}

/// How a particular I/O edge retries: starting delay, delay cap, and
/// the total time budget before the last error wins.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub deadline: Duration,
    pub jitter: bool,
}

impl RetryPolicy {
    /// Exponential backoff with jitter, doubling from 100ms up to 10s.
    pub fn exponential(deadline: Duration) -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(10),
            deadline,
            jitter: true,
        }
    }

    /// Fixed interval between attempts, no jitter.
    pub fn constant(interval: Duration, deadline: Duration) -> Self {
        Self {
            initial: interval,
            max: interval,
            deadline,
            jitter: false,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// exhausts the policy's deadline.
pub async fn retry<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut backoff = Backoff::new(policy.initial, policy.max, policy.jitter);

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => {
                let delay = backoff.fail();
                if started.elapsed() + delay >= policy.deadline {
                    warn!(
                        "{what}: giving up after {} attempts: {err}",
                        backoff.failures()
                    );
                    return Err(err);
                }
                debug!(
                    "{what}: transient failure (attempt {}), retrying in {:?}: {err}",
                    backoff.failures(),
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
