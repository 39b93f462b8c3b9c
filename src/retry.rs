use std::time::Duration;

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// How the logger loop reacts to a failed read or write.
///
/// Every failure is treated the same way: wait `backoff`, then try again.
/// `max_attempts` bounds the number of consecutive failures; `None` retries
/// forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn should_give_up(&self, consecutive_failures: u32) -> bool {
        match self.max_attempts {
            Some(max) => consecutive_failures >= max,
            None => false,
        }
    }
}
