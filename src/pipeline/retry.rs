//! Retry policy as an explicit state machine.
//!
//! ```text
//!             ┌──── 429 / 5xx, attempts left ────┐
//!             ▼                                  │
//!   Attempting(0) ──▶ Attempting(1) ──▶ … ──▶ Attempting(max-1)
//!        │  2xx ──▶ Succeeded                    │ 429 / 5xx
//!        │  other status / transport ──▶ FailedFatal   ▼
//!        │                                   FailedTransient
//! ```
//!
//! [`RetryPolicy::transition`] is a pure function and [`Sleeper`] is
//! injected, so the whole policy is testable without a network or a clock.
//! Transport failures (DNS, connect, timeout) are classified as fatal and
//! never retried.

use async_trait::async_trait;
use std::time::Duration;

/// How one attempt ended, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptClass {
    /// 2xx.
    Success,
    /// 429 or 5xx.
    Transient,
    /// Any other status, or the transport call itself failed.
    Fatal,
}

impl AttemptClass {
    /// Classify an HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => AttemptClass::Success,
            429 | 500..=599 => AttemptClass::Transient,
            _ => AttemptClass::Fatal,
        }
    }
}

/// States of a single file's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to send attempt `n` (0-based).
    Attempting(u32),
    Succeeded,
    FailedTransient,
    FailedFatal,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Next state after attempt `attempt` ended with `class`.
    pub fn transition(&self, attempt: u32, class: AttemptClass) -> RetryState {
        match class {
            AttemptClass::Success => RetryState::Succeeded,
            AttemptClass::Fatal => RetryState::FailedFatal,
            AttemptClass::Transient if attempt + 1 < self.max_attempts => {
                RetryState::Attempting(attempt + 1)
            }
            AttemptClass::Transient => RetryState::FailedTransient,
        }
    }

    /// Wait after a transient failure of attempt `attempt`: `base * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Sleeps between attempts. Swapped for a recording fake in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeping on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_statuses() {
        assert_eq!(AttemptClass::from_status(200), AttemptClass::Success);
        assert_eq!(AttemptClass::from_status(429), AttemptClass::Transient);
        assert_eq!(AttemptClass::from_status(500), AttemptClass::Transient);
        assert_eq!(AttemptClass::from_status(503), AttemptClass::Transient);
        assert_eq!(AttemptClass::from_status(400), AttemptClass::Fatal);
        assert_eq!(AttemptClass::from_status(403), AttemptClass::Fatal);
        assert_eq!(AttemptClass::from_status(404), AttemptClass::Fatal);
        assert_eq!(AttemptClass::from_status(304), AttemptClass::Fatal);
    }

    #[test]
    fn transient_walks_through_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.transition(0, AttemptClass::Transient),
            RetryState::Attempting(1)
        );
        assert_eq!(
            policy.transition(1, AttemptClass::Transient),
            RetryState::Attempting(2)
        );
        assert_eq!(
            policy.transition(2, AttemptClass::Transient),
            RetryState::FailedTransient
        );
    }

    #[test]
    fn fatal_and_success_are_terminal() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.transition(0, AttemptClass::Fatal), RetryState::FailedFatal);
        assert_eq!(policy.transition(1, AttemptClass::Success), RetryState::Succeeded);
    }

    #[test]
    fn single_attempt_never_retries() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1));
        assert_eq!(
            policy.transition(0, AttemptClass::Transient),
            RetryState::FailedTransient
        );
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff(64) >= policy.backoff(31));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_waits_on_paused_clock() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
