use std::time::Duration;

use pagekeeper_config::ConsumerSettings;

/// Delay schedule for failed fetches: `initial`, then doubling up to `max`.
///
/// A zero `initial` retries immediately every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Delay following `previous`. Pass `Duration::ZERO` after a success.
    #[must_use]
    pub fn next(&self, previous: Duration) -> Duration {
        let next = if previous.is_zero() {
            self.initial
        } else {
            previous.saturating_mul(2)
        };
        next.min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Requested events per fetch, clamped to what the fetcher accepts.
    pub batch_size: usize,
    /// Pause after a fetch that returned nothing.
    pub idle_interval: Duration,
    pub fetch_backoff: Backoff,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::from(&ConsumerSettings::default())
    }
}

impl From<&ConsumerSettings> for ConsumerConfig {
    fn from(settings: &ConsumerSettings) -> Self {
        Self {
            batch_size: settings.batch_size,
            idle_interval: Duration::from_millis(settings.idle_interval_ms),
            fetch_backoff: Backoff {
                initial: Duration::from_millis(settings.fetch_backoff_initial_ms),
                max: Duration::from_millis(settings.fetch_backoff_max_ms),
            },
        }
    }
}
