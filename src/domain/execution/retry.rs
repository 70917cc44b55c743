use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential,
}

/// How often and how patiently a failed swap is restarted from quoting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries until success
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(20),
            backoff: Backoff::Exponential,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn unbounded(backoff: Backoff, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
            base_delay,
            max_delay,
        }
    }

    /// Number of the attempt after `attempts_made`, saturating at `u32::MAX`
    pub fn next_attempt(attempts_made: u32) -> u32 {
        attempts_made.saturating_add(1)
    }

    /// Whether another attempt may start after `attempts_made` failures
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts_made < max,
            None => true,
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let exponent = attempt.saturating_sub(1).min(16);
                self.base_delay.saturating_mul(1u32 << exponent)
            }
        };
        delay.min(self.max_delay)
    }
}
