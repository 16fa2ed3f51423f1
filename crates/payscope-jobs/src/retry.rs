use std::time::Duration;

use rand::Rng;

/// Backoff parameters for a pipeline stage (spec.md §4.8). `base` is the
/// first retry's floor; `cap` bounds how long any single wait grows to;
/// `max_retries` is the ceiling after which a job moves to DLQ instead of
/// retrying again.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_secs(60),
            max_retries,
        }
    }

    pub fn exhausted(&self, attempt_count: u32) -> bool {
        attempt_count >= self.max_retries
    }

    /// Decorrelated jitter backoff (spec.md §4.8): `sleep = min(cap,
    /// random(base, previous_sleep * 3))`. This is the AWS Architecture
    /// Blog's "decorrelated jitter" formula; it avoids both the thundering
    /// herd of fixed exponential backoff and the unbounded growth of plain
    /// jitter by re-rolling off the previous sleep each time.
    pub fn next_backoff(&self, previous_sleep: Duration) -> Duration {
        let previous_millis = previous_sleep.as_millis().max(self.base.as_millis()) as u64;
        let upper = previous_millis.saturating_mul(3).max(self.base.as_millis() as u64);
        let lower = self.base.as_millis() as u64;
        let sampled = if upper > lower {
            rand::thread_rng().gen_range(lower..=upper)
        } else {
            lower
        };
        Duration::from_millis(sampled).min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_never_exceeds_cap() {
        let policy = RetryPolicy::new(5);
        let mut sleep = policy.base;
        for _ in 0..50 {
            sleep = policy.next_backoff(sleep);
            assert!(sleep <= policy.cap);
        }
    }

    #[test]
    fn backoff_never_below_base() {
        let policy = RetryPolicy::new(5);
        let sleep = policy.next_backoff(Duration::from_millis(0));
        assert!(sleep >= policy.base);
    }

    #[test]
    fn exhausted_once_attempt_count_reaches_max_retries() {
        let policy = RetryPolicy::new(5);
        assert!(!policy.exhausted(4));
        assert!(policy.exhausted(5));
        assert!(policy.exhausted(6));
    }
}
