use std::time::Duration;

use tracing::warn;

use crate::error::ScrapeError;
use crate::transport::TransportError;

/// Bounded exponential backoff for remote calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn connection() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            multiplier: 2,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2,
        }
    }

    /// No sleeping between attempts; used by tests and dry runs.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before attempt `attempt + 1`, with `attempt` counted from 1.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up.
    pub fn run<T>(
        &self,
        endpoint: &str,
        mut op: impl FnMut() -> Result<T, TransportError>,
    ) -> Result<T, ScrapeError> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "Connection error on {} ({}), retrying in {:?} ({}/{})",
                        endpoint, err, delay, attempt, max_attempts
                    );
                    std::thread::sleep(delay);
                }
                Err(err) if err.is_retryable() => {
                    return Err(ScrapeError::Unreachable {
                        endpoint: endpoint.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    return Err(ScrapeError::Request {
                        endpoint: endpoint.to_string(),
                        source: err,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::connection()
    }
}
