//! Retry decisions for failed exchanges.
//!
//! [`RetryPolicy::decide`] is a pure function of the attempt number, the
//! failure kind and the request's [`RetrySafety`]. It never sleeps; the
//! client applies the returned delay.

use std::time::Duration;

use rand::Rng;

use crate::clients::errors::ErrorKind;

/// Default attempt cap, first attempt included.
pub const DEFAULT_MAX_TRIES: u32 = 5;

/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default ceiling for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Whether repeating a request could apply its effect twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetrySafety {
    /// GET, or a mutation carrying an idempotency key.
    Idempotent,
    /// A mutation without an idempotency key.
    NonIdempotent,
}

/// What to do after a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then try again.
    Retry {
        /// Time to wait before the next attempt.
        delay: Duration,
    },
    /// Surface the failure.
    GiveUp,
}

/// Attempt cap and backoff schedule for retrying transient failures.
///
/// Transport failures, HTTP 429 and HTTP 5xx are retried; every other kind
/// is terminal. A 429 waits for `Retry-After` when the server sends it and
/// otherwise retries immediately, leaving the wait to the rate-limit
/// governor. Other retries use "equal jitter": half of the exponential delay
/// is fixed and half is random, so concurrent callers spread out.
///
/// Requests that are not [`RetrySafety::Idempotent`] are retried only when
/// the server cannot have applied them: connection failures and 5xx.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_catalog::clients::{ErrorKind, RetryDecision, RetryPolicy, RetrySafety};
///
/// let policy = RetryPolicy::default().with_max_tries(3);
/// let server_error = ErrorKind::Server(503);
///
/// assert!(matches!(
///     policy.decide(1, &server_error, RetrySafety::Idempotent),
///     RetryDecision::Retry { .. }
/// ));
/// assert_eq!(
///     policy.decide(3, &server_error, RetrySafety::Idempotent),
///     RetryDecision::GiveUp
/// );
/// assert_eq!(
///     policy.decide(1, &ErrorKind::Client(404), RetrySafety::Idempotent),
///     RetryDecision::GiveUp
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Sets the attempt cap, first attempt included.
    #[must_use]
    pub const fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the ceiling for a single delay.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Enables or disables jitter. Without jitter delays are exactly
    /// exponential.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the attempt cap.
    #[must_use]
    pub const fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Decides what to do after attempt number `attempt` (1-based) failed
    /// with `kind`.
    #[must_use]
    pub fn decide(&self, attempt: u32, kind: &ErrorKind, safety: RetrySafety) -> RetryDecision {
        if attempt >= self.max_tries {
            return RetryDecision::GiveUp;
        }

        let idempotent = safety == RetrySafety::Idempotent;
        match *kind {
            ErrorKind::Transport { connect, .. } if idempotent || connect => RetryDecision::Retry {
                delay: self.backoff(attempt),
            },
            ErrorKind::RateLimited { retry_after } if idempotent => RetryDecision::Retry {
                delay: retry_after.unwrap_or(Duration::ZERO),
            },
            ErrorKind::Server(_) => RetryDecision::Retry {
                delay: self.backoff(attempt),
            },
            _ => RetryDecision::GiveUp,
        }
    }

    /// Exponential delay for the retry following `attempt`, capped and
    /// jittered.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay);

        if !self.jitter || delay.is_zero() {
            return delay;
        }

        let half = delay / 2;
        let spread = half.mul_f64(rand::thread_rng().gen::<f64>());
        half + spread
    }
}

/// Bookkeeping for one logical request's retry loop.
#[derive(Clone, Debug, Default)]
pub(crate) struct AttemptRecord {
    pub(crate) attempts: u32,
    pub(crate) last_kind: Option<ErrorKind>,
    pub(crate) last_delay: Option<Duration>,
}

impl AttemptRecord {
    /// Starts the next attempt and returns its 1-based number.
    pub(crate) fn begin(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Records a failure and the delay chosen for it.
    pub(crate) fn fail(&mut self, kind: ErrorKind, delay: Option<Duration>) {
        self.last_kind = Some(kind);
        self.last_delay = delay;
    }
}
