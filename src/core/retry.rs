//! Retry and backoff policy.
//!
//! Stateless: given an error category and the attempt number just made, the
//! policy says whether to try again, how long to wait first, and whether the
//! wait should be surfaced to the caller as a visible countdown. Quota hits
//! back off linearly and are shown; other transient failures get a short
//! fixed wait. Credential and region failures are never retried.

use std::time::Duration;

use crate::core::classify::ErrorCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub wait: Duration,
    /// Quota waits are long enough to be worth showing as a countdown;
    /// ordinary transient waits are not.
    pub show_countdown: bool,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per panel, including the first one.
    pub max_attempts: u32,
    /// Quota backoff grows linearly: `attempt × quota_step`.
    pub quota_step: Duration,
    /// Fixed wait for other retryable failures.
    pub transient_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            quota_step: Duration::from_secs(15),
            transient_wait: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn retryable(&self, category: ErrorCategory) -> bool {
        matches!(category, ErrorCategory::Quota | ErrorCategory::Generic)
    }

    /// Wait to apply after the `attempt`-th failed try (1-based), or `None`
    /// when the category must not be retried at all.
    pub fn backoff(&self, category: ErrorCategory, attempt: u32) -> Option<RetryDecision> {
        match category {
            ErrorCategory::Quota => Some(RetryDecision {
                wait: self.quota_step * attempt,
                show_countdown: true,
            }),
            ErrorCategory::Generic => Some(RetryDecision {
                wait: self.transient_wait,
                show_countdown: false,
            }),
            ErrorCategory::CredentialInvalid
            | ErrorCategory::RegionUnsupported
            | ErrorCategory::ScriptUnavailable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        for attempt in 1..=3 {
            let decision = policy.backoff(ErrorCategory::Quota, attempt).unwrap();
            assert_eq!(decision.wait, Duration::from_secs(15 * u64::from(attempt)));
            assert!(decision.show_countdown);
        }
    }

    #[test]
    fn transient_backoff_is_fixed_and_silent() {
        let policy = RetryPolicy::default();
        let first = policy.backoff(ErrorCategory::Generic, 1).unwrap();
        let second = policy.backoff(ErrorCategory::Generic, 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.wait, Duration::from_secs(1));
        assert!(!first.show_countdown);
    }

    #[test]
    fn fatal_categories_get_no_backoff() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff(ErrorCategory::CredentialInvalid, 1).is_none());
        assert!(policy.backoff(ErrorCategory::RegionUnsupported, 1).is_none());
        assert!(policy.backoff(ErrorCategory::ScriptUnavailable, 1).is_none());
    }

    #[test]
    fn retryable_matches_backoff_availability() {
        let policy = RetryPolicy::default();
        for category in [
            ErrorCategory::CredentialInvalid,
            ErrorCategory::RegionUnsupported,
            ErrorCategory::Quota,
            ErrorCategory::ScriptUnavailable,
            ErrorCategory::Generic,
        ] {
            assert_eq!(
                policy.retryable(category),
                policy.backoff(category, 1).is_some()
            );
        }
    }
}
