//! Retransmission timing.
//!
//! The protocol uses a fixed retransmission timeout with no backoff and no
//! RTT estimation. [`RetransmitPolicy`] captures that rule together with the
//! optional per-segment retry bound.

use std::time::{Duration, Instant};

use crate::core::Config;

/// Fixed-timeout retransmission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitPolicy {
    timeout: Duration,
    max_retransmits: Option<u32>,
}

impl RetransmitPolicy {
    /// Create a policy.
    pub fn new(timeout: Duration, max_retransmits: Option<u32>) -> Self {
        Self {
            timeout,
            max_retransmits,
        }
    }

    /// Policy described by a configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retransmit_timeout, config.max_retransmits)
    }

    /// Deadline for a segment (re)sent at `now`.
    pub fn deadline(&self, now: Instant) -> Instant {
        now + self.timeout
    }

    /// Whether a segment already resent `retransmits` times may not be
    /// resent again.
    pub fn exhausted(&self, retransmits: u32) -> bool {
        match self.max_retransmits {
            Some(limit) => retransmits >= limit,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_has_no_backoff() {
        let policy = RetransmitPolicy::new(Duration::from_millis(2000), None);
        let now = Instant::now();
        let first = policy.deadline(now);
        let second = policy.deadline(first);
        assert_eq!(first - now, Duration::from_millis(2000));
        assert_eq!(second - first, Duration::from_millis(2000));
    }

    #[test]
    fn test_unbounded_never_exhausted() {
        let policy = RetransmitPolicy::from_config(&Config::default());
        assert!(!policy.exhausted(0));
        assert!(!policy.exhausted(u32::MAX));
    }

    #[test]
    fn test_bounded_exhaustion() {
        let policy = RetransmitPolicy::new(Duration::from_millis(100), Some(3));
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
    }
}
