//! Exponential backoff and sleep jitter.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff schedule with a cap and optional jitter.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Maximum delay (caps exponential growth).
    pub max: Duration,
    /// Scale the delay by a uniform random factor in `[1-jitter, 1+jitter]`
    /// (`<= 0` disables jitter).
    pub jitter: f64,
}

impl BackoffConfig {
    /// Returns the delay before retry number `attempt` (0-based):
    /// `min(base * 2^attempt, max)`, jittered.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = exp.min(self.max.as_secs_f64());
        with_jitter(Duration::from_secs_f64(capped), self.jitter)
    }
}

/// Scale `base` by a uniform random factor in `[1-jitter, 1+jitter]`.
///
/// A `jitter <= 0` returns `base` unchanged.
pub fn with_jitter(base: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return base;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    Duration::from_secs_f64((base.as_secs_f64() * factor).max(0.0))
}
