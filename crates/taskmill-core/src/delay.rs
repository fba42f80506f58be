use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ConfigError;

/// How the pause between retries grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Every retry waits `retry_pause` seconds.
    Constant,
    /// The n-th attempt waits `retry_pause * n` seconds.
    Incremental,
}

/// Per-processor retry/backoff configuration.
///
/// Stateless: the policy is consulted once per failed attempt and decides
/// whether the task goes back to the queue and how far in the future it
/// becomes eligible again.
#[derive(Debug, Clone)]
pub struct DelayPolicy {
    retry_on: HashSet<String>,
    retries_count: u32,
    retry_pause: u64,
    strategy: RetryStrategy,
}

impl DelayPolicy {
    /// Build a policy, rejecting invalid configuration eagerly.
    ///
    /// `retry_on` is the set of failure kinds worth retrying and must not
    /// be empty; `retries_count` is the number of additional attempts
    /// allowed after the first failure and must be at least 1;
    /// `retry_pause` is in seconds.
    pub fn new<I, S>(
        retry_on: I,
        retries_count: u32,
        retry_pause: u64,
        strategy: RetryStrategy,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let retry_on: HashSet<String> = retry_on.into_iter().map(Into::into).collect();
        if retry_on.is_empty() {
            return Err(ConfigError::EmptyRetryOn);
        }
        if retries_count < 1 {
            return Err(ConfigError::ZeroRetries);
        }
        Ok(DelayPolicy {
            retry_on,
            retries_count,
            retry_pause,
            strategy,
        })
    }

    /// Whether the failure kind is one this policy retries at all.
    pub fn handles(&self, kind: &str) -> bool {
        self.retry_on.contains(kind)
    }

    /// True while attempts remain. `try_num` counts attempts already made,
    /// including the one that just failed.
    pub fn should_retry(&self, try_num: u32) -> bool {
        try_num.saturating_sub(1) < self.retries_count
    }

    /// Pause before the next attempt.
    ///
    /// Callers must check [`should_retry`](Self::should_retry) first;
    /// asking for a delay once the tries are exhausted is a contract
    /// violation, not a recoverable condition.
    pub fn next_delay(&self, try_num: u32) -> Duration {
        assert!(
            self.should_retry(try_num),
            "task should not be delayed, tries ended"
        );
        let secs = match self.strategy {
            RetryStrategy::Constant => self.retry_pause,
            RetryStrategy::Incremental => self.retry_pause * u64::from(try_num),
        };
        Duration::from_secs(secs)
    }

    /// Timestamp at which a failed task becomes eligible again.
    pub fn next_execute_after(&self, now: DateTime<Utc>, try_num: u32) -> DateTime<Utc> {
        now + chrono::Duration::seconds(self.next_delay(try_num).as_secs() as i64)
    }
}
