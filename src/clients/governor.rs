//! Client-side throttling against the shop's REST call budget.
//!
//! Shopify reports the leaky-bucket state of a shop on every response as
//! `X-Shopify-Shop-Api-Call-Limit: used/limit`. A [`RateLimitGovernor`]
//! keeps the latest such report for one shop and holds callers back until
//! the bucket has room, so that concurrent requests do not run into 429s.
//!
//! The server is authoritative: the governor never counts locally past what
//! a response confirmed. It only adds the permits currently in flight, and
//! (optionally) drains `used` at the platform's leak rate between reports.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::clients::cancel::CancellationToken;
use crate::clients::http_response::ApiCallLimit;

/// Default spacing between dispatches while the bucket state is unknown.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Default first delay when the bucket is exhausted.
pub const DEFAULT_BACKOFF_FLOOR: Duration = Duration::from_millis(500);

/// Default ceiling for the exhaustion backoff.
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(10);

/// Calls per second the Shopify REST bucket leaks for standard plans.
pub const DEFAULT_LEAK_RATE: u32 = 2;

/// Error returned when a wait for capacity is cancelled.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("Cancelled while waiting for rate-limit capacity")]
pub struct Cancelled;

/// Tuning for a [`RateLimitGovernor`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_catalog::clients::GovernorConfig;
///
/// let config = GovernorConfig::default()
///     .with_min_interval(Duration::from_millis(100))
///     .with_leak_rate(None);
/// assert_eq!(config.leak_rate(), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GovernorConfig {
    min_interval: Duration,
    backoff_floor: Duration,
    backoff_ceiling: Duration,
    leak_rate: Option<u32>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            backoff_floor: DEFAULT_BACKOFF_FLOOR,
            backoff_ceiling: DEFAULT_BACKOFF_CEILING,
            leak_rate: Some(DEFAULT_LEAK_RATE),
        }
    }
}

impl GovernorConfig {
    /// Sets the spacing between dispatches while no report has been seen.
    #[must_use]
    pub const fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Sets the exhaustion backoff range.
    #[must_use]
    pub const fn with_backoff(mut self, floor: Duration, ceiling: Duration) -> Self {
        self.backoff_floor = floor;
        self.backoff_ceiling = ceiling;
        self
    }

    /// Sets the leak rate in calls per second. `None` means `used` only
    /// changes when a response reports it.
    #[must_use]
    pub const fn with_leak_rate(mut self, leak_rate: Option<u32>) -> Self {
        self.leak_rate = leak_rate;
        self
    }

    /// Spacing between dispatches while the state is unknown.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// First delay when the bucket is exhausted.
    #[must_use]
    pub const fn backoff_floor(&self) -> Duration {
        self.backoff_floor
    }

    /// Ceiling for the exhaustion backoff.
    #[must_use]
    pub const fn backoff_ceiling(&self) -> Duration {
        self.backoff_ceiling
    }

    /// Leak rate in calls per second, if enabled.
    #[must_use]
    pub const fn leak_rate(&self) -> Option<u32> {
        self.leak_rate
    }

    fn backoff(&self, streak: u32) -> Duration {
        self.backoff_floor
            .saturating_mul(1_u32 << streak.min(16))
            .min(self.backoff_ceiling)
    }
}

/// A point-in-time view of the governor's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GovernorSnapshot {
    /// Calls used, as last reported and drained by the leak rate.
    pub used: u32,
    /// Bucket size, or `None` while unknown.
    pub limit: Option<u32>,
    /// Permits handed out and not yet settled.
    pub reserved: u32,
}

#[derive(Debug, Default)]
struct State {
    used: u32,
    limit: Option<u32>,
    reported_at: Option<Instant>,
    reserved: u32,
    next_seq: u64,
    last_applied_seq: u64,
    throttle_streak: u32,
    last_dispatch: Option<Instant>,
    blocked_until: Option<Instant>,
}

enum Wait {
    /// Wait a fixed time (server block, unknown-state spacing).
    For(Duration),
    /// The bucket is full; back off, but no longer than `leak` if set.
    Exhausted { leak: Option<Duration> },
}

enum Settlement {
    Report(Option<ApiCallLimit>),
    Throttled {
        report: Option<ApiCallLimit>,
        retry_after: Option<Duration>,
    },
    Abandoned,
}

/// Rate-limit state for one shop, shared by every client of that shop.
///
/// Create one per shop and hand it to each
/// [`RestClient`](crate::clients::RestClient) for that shop; clients of
/// different shops must not share a governor.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use shopify_catalog::clients::{ApiCallLimit, CancellationToken, GovernorConfig, RateLimitGovernor};
///
/// # tokio_test::block_on(async {
/// let governor = Arc::new(RateLimitGovernor::new(GovernorConfig::default()));
/// let cancel = CancellationToken::new();
///
/// let permit = governor.acquire(&cancel).await.unwrap();
/// // ... perform the exchange ...
/// permit.reconcile(ApiCallLimit::parse("1/40"));
///
/// assert_eq!(governor.snapshot().limit, Some(40));
/// # });
/// ```
#[derive(Debug)]
pub struct RateLimitGovernor {
    config: GovernorConfig,
    state: Mutex<State>,
    notify: Notify,
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RateLimitGovernor>();
    assert_send_sync::<Permit>();
};

impl RateLimitGovernor {
    /// Creates a governor that knows nothing about the bucket yet.
    #[must_use]
    pub fn new(config: GovernorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Waits until the bucket has room, then reserves one call.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `cancel` fires first; nothing is reserved in
    /// that case.
    pub async fn acquire(self: &Arc<Self>, cancel: &CancellationToken) -> Result<Permit, Cancelled> {
        let mut exhausted_waits: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            // Registered before the state check so a settle in between is not lost.
            let notified = self.notify.notified();

            let wait = {
                let mut state = self.lock();
                match self.try_reserve(&mut state, Instant::now()) {
                    Ok(seq) => {
                        return Ok(Permit {
                            governor: Arc::clone(self),
                            seq,
                            settled: false,
                        });
                    }
                    Err(Wait::For(delay)) => delay,
                    Err(Wait::Exhausted { leak }) => {
                        let backoff = self.config.backoff(exhausted_waits);
                        exhausted_waits = exhausted_waits.saturating_add(1);
                        leak.map_or(backoff, |leak| leak.min(backoff))
                    }
                }
            };

            tracing::debug!(
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Waiting for rate-limit capacity"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Cancelled),
                () = notified => {}
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Records a report that did not arrive through a [`Permit`], for
    /// example from an exchange made outside this client. It is treated as
    /// the newest report.
    pub fn observe(&self, report: ApiCallLimit) {
        {
            let mut state = self.lock();
            state.next_seq += 1;
            let seq = state.next_seq;
            Self::apply_report(&mut state, seq, report, Instant::now());
        }
        self.notify.notify_waiters();
    }

    /// Returns the current state.
    #[must_use]
    pub fn snapshot(&self) -> GovernorSnapshot {
        let state = self.lock();
        GovernorSnapshot {
            used: self.current_used(&state, Instant::now()),
            limit: state.limit,
            reserved: state.reserved,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_reserve(&self, state: &mut State, now: Instant) -> Result<u64, Wait> {
        if let Some(until) = state.blocked_until {
            if until > now {
                return Err(Wait::For(until - now));
            }
            state.blocked_until = None;
        }

        match state.limit {
            None => {
                if let Some(last) = state.last_dispatch {
                    let elapsed = now.saturating_duration_since(last);
                    if elapsed < self.config.min_interval {
                        return Err(Wait::For(self.config.min_interval - elapsed));
                    }
                }
            }
            Some(limit) => {
                let used = self.current_used(state, now);
                let pending = used.saturating_add(state.reserved);
                if pending >= limit {
                    let leak = self.config.leak_rate.filter(|rate| *rate > 0).map(|rate| {
                        let over = u64::from(pending - limit) + 1;
                        Duration::from_millis(over * 1000 / u64::from(rate))
                    });
                    return Err(Wait::Exhausted { leak });
                }
            }
        }

        state.reserved += 1;
        state.next_seq += 1;
        state.last_dispatch = Some(now);
        Ok(state.next_seq)
    }

    fn current_used(&self, state: &State, now: Instant) -> u32 {
        match (self.config.leak_rate, state.reported_at) {
            (Some(rate), Some(at)) => {
                let leaked =
                    now.saturating_duration_since(at).as_millis() * u128::from(rate) / 1000;
                state
                    .used
                    .saturating_sub(u32::try_from(leaked).unwrap_or(u32::MAX))
            }
            _ => state.used,
        }
    }

    fn apply_report(state: &mut State, seq: u64, report: ApiCallLimit, now: Instant) -> bool {
        if seq <= state.last_applied_seq {
            return false;
        }
        state.last_applied_seq = seq;
        state.used = report.used;
        state.limit = Some(report.limit);
        state.reported_at = Some(now);
        true
    }

    fn settle(&self, seq: u64, settlement: Settlement) {
        {
            let mut state = self.lock();
            let now = Instant::now();
            state.reserved = state.reserved.saturating_sub(1);

            match settlement {
                Settlement::Report(Some(report)) => {
                    if Self::apply_report(&mut state, seq, report, now) {
                        state.throttle_streak = 0;
                    }
                }
                Settlement::Report(None) => {
                    if seq > state.last_applied_seq {
                        state.last_applied_seq = seq;
                        state.limit = None;
                        state.reported_at = None;
                    }
                }
                Settlement::Throttled {
                    report,
                    retry_after,
                } => {
                    match report {
                        Some(report) => {
                            Self::apply_report(&mut state, seq, report, now);
                        }
                        None => {
                            if let Some(limit) = state.limit {
                                state.used = state.used.max(limit);
                                state.reported_at = Some(now);
                            }
                        }
                    }
                    let delay = retry_after
                        .unwrap_or_else(|| self.config.backoff(state.throttle_streak));
                    state.throttle_streak = state.throttle_streak.saturating_add(1);
                    let until = now + delay;
                    state.blocked_until = Some(state.blocked_until.map_or(until, |b| b.max(until)));
                    tracing::warn!(
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Shop rate limit hit, blocking dispatches"
                    );
                }
                Settlement::Abandoned => {}
            }
        }
        self.notify.notify_waiters();
    }
}

/// One reserved call against the bucket.
///
/// Settle it with [`reconcile`](Self::reconcile) once the response is in, or
/// with [`throttled`](Self::throttled) on HTTP 429. Dropping an unsettled
/// permit (e.g. after a transport failure) only releases the reservation.
#[derive(Debug)]
#[must_use = "a permit holds a reservation until it is settled or dropped"]
pub struct Permit {
    governor: Arc<RateLimitGovernor>,
    seq: u64,
    settled: bool,
}

impl Permit {
    /// Releases the reservation and records the response's rate-limit
    /// report. Reports older than one already applied are ignored; a missing
    /// header marks the state unknown.
    pub fn reconcile(mut self, report: Option<ApiCallLimit>) {
        self.settled = true;
        self.governor.settle(self.seq, Settlement::Report(report));
    }

    /// Releases the reservation after an HTTP 429 and blocks every caller of
    /// this shop for `retry_after`, or for the governor's backoff when the
    /// server sent no delay.
    pub fn throttled(mut self, report: Option<ApiCallLimit>, retry_after: Option<Duration>) {
        self.settled = true;
        self.governor.settle(
            self.seq,
            Settlement::Throttled {
                report,
                retry_after,
            },
        );
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if !self.settled {
            self.governor.settle(self.seq, Settlement::Abandoned);
        }
    }
}
