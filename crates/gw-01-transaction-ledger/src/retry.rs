//! Retry policy for ledger writes.
//!
//! Ledger writes must land before a flow result is observed, so transient
//! store failures (file-backed adapter hitting a full disk, for example)
//! get a bounded number of retries with backoff instead of failing the
//! whole flow on the first hiccup.

use std::time::Duration;

/// Delay schedule between retry attempts.
#[derive(Debug, Clone, Copy)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Doubling delay, capped.
    Exponential { base: Duration, cap: Duration },
}

impl Backoff {
    /// Delay to wait before retry number `attempt` (1-based; attempt 0 is
    /// the initial try and never waits).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { base, cap } => {
                let exp = attempt.saturating_sub(1).min(16);
                let scaled = base.saturating_mul(2u32.saturating_pow(exp));
                scaled.min(*cap)
            }
        }
    }
}

/// Bounded retry loop around a fallible operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first (must be >= 1).
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(50),
                cap: Duration::from_secs(2),
            },
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts are exhausted, sleeping per
    /// the backoff schedule between tries. Returns the last error when all
    /// attempts fail.
    pub async fn run<T, E, F>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.backoff.delay(attempt)).await;
            }
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        "[gw-01] {} failed (attempt {}/{}): {}",
                        label,
                        attempt + 1,
                        attempts,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        // attempts >= 1, so last_err is populated here.
        Err(last_err.take().unwrap_or_else(|| unreachable!()))
    }
}
