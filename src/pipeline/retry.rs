//! Retry accounting for unresolved batch digests.

use std::time::Duration;

/// Bounded constant-interval retry policy.
///
/// The interval is a fixed sleep between attempts; `max_retries` caps the
/// attempt count, with -1 meaning retry indefinitely. Exhausting a finite
/// budget is fatal for the whole run: skipping a persistently missing batch
/// would corrupt the monotonic index ordering.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Attempts per missing batch; -1 retries forever.
    pub max_retries: i64,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_retries: i64) -> Self {
        Self {
            interval,
            max_retries,
        }
    }

    /// True when the budget never runs out.
    pub fn unlimited(&self) -> bool {
        self.max_retries < 0
    }

    /// True when `attempt` attempts have spent the whole budget.
    pub fn exhausted(&self, attempt: u64) -> bool {
        !self.unlimited() && attempt >= self.max_retries as u64
    }
}
