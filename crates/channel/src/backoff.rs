//! Linear-backoff retry schedule for dropped connections.
//!
//! Each unexpected closure increments an attempt counter; the delay
//! before the next attempt is `base_delay * attempt`. A successful
//! open resets the counter. Once the counter would exceed
//! `max_attempts`, no further attempt is scheduled and the channel
//! stays closed until the caller resubscribes.

use std::time::Duration;

/// Tunable parameters for the retry schedule.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay multiplier: attempt N waits `base_delay * N`.
    pub base_delay: Duration,
    /// Hard ceiling on consecutive reconnection attempts.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Load the schedule from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `RECONNECT_BASE_DELAY_MS` | `1000`  |
    /// | `RECONNECT_MAX_ATTEMPTS`  | `5`     |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_delay = std::env::var("RECONNECT_BASE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.base_delay);

        let max_attempts = std::env::var("RECONNECT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_attempts);

        Self {
            base_delay,
            max_attempts,
        }
    }
}

/// Consecutive-failure counter driving the backoff delays.
#[derive(Debug, Default)]
pub struct RetrySchedule {
    attempt: u32,
}

impl RetrySchedule {
    /// Start with zero recorded failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of consecutive failures recorded so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reset after a successful open. The next failure waits the base
    /// delay again.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Record a failure and return the delay before the next attempt,
    /// or `None` once the attempt ceiling is reached.
    pub fn next_delay(&mut self, config: &ReconnectConfig) -> Option<Duration> {
        if self.attempt >= config.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(config.base_delay * self.attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_linearly() {
        let config = ReconnectConfig {
            base_delay: Duration::from_millis(100),
            max_attempts: 5,
        };
        let mut schedule = RetrySchedule::new();

        let expected_ms = [100, 200, 300, 400, 500];
        for &ms in &expected_ms {
            assert_eq!(
                schedule.next_delay(&config),
                Some(Duration::from_millis(ms))
            );
        }
    }

    #[test]
    fn no_attempt_scheduled_past_the_ceiling() {
        let config = ReconnectConfig {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        };
        let mut schedule = RetrySchedule::new();

        for _ in 0..5 {
            assert!(schedule.next_delay(&config).is_some());
        }
        // The 6th consecutive failure schedules nothing.
        assert_eq!(schedule.next_delay(&config), None);
        // And it stays that way.
        assert_eq!(schedule.next_delay(&config), None);
    }

    #[test]
    fn reset_returns_to_base_delay() {
        let config = ReconnectConfig {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        };
        let mut schedule = RetrySchedule::new();

        schedule.next_delay(&config);
        schedule.next_delay(&config);
        schedule.next_delay(&config);
        assert_eq!(schedule.attempt(), 3);

        schedule.reset();
        assert_eq!(schedule.attempt(), 0);
        assert_eq!(schedule.next_delay(&config), Some(Duration::from_secs(1)));
    }

    #[test]
    fn reset_also_reopens_an_exhausted_schedule() {
        let config = ReconnectConfig {
            base_delay: Duration::from_secs(1),
            max_attempts: 2,
        };
        let mut schedule = RetrySchedule::new();

        schedule.next_delay(&config);
        schedule.next_delay(&config);
        assert_eq!(schedule.next_delay(&config), None);

        schedule.reset();
        assert_eq!(schedule.next_delay(&config), Some(Duration::from_secs(1)));
    }
}
