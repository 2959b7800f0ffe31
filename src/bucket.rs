//! The token bucket primitive backing every client's budget.
//!
//! Tokens accumulate continuously at the configured rate up to the burst
//! capacity, and each admitted request spends exactly one. There is no
//! discrete tick: refill is computed from elapsed wall time at the moment
//! of each probe, so a bucket left alone simply fills back up.

use std::time::Instant;

use crate::config::RateProfile;

/// A continuously refilled token bucket.
///
/// State is fractional (`f64`) so that sub-token refill between probes is
/// never truncated; a client on a very low rate still accumulates progress
/// toward its next token across denied checks.
#[derive(Debug)]
pub struct TokenBucket {
    /// Tokens added per second. Zero disables steady refill entirely.
    rate: f64,
    /// Maximum token count; also the initial budget.
    capacity: f64,
    /// Current token count, always within `0.0..=capacity`.
    available: f64,
    /// When `available` was last brought up to date.
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a bucket holding its full burst budget.
    pub fn new(profile: RateProfile) -> Self {
        let capacity = f64::from(profile.burst);
        Self {
            rate: profile.per_second,
            capacity,
            available: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Attempts to consume one token, refilling from elapsed time first.
    ///
    /// Returns `true` when the request should be admitted.
    pub fn try_consume(&mut self) -> bool {
        self.try_consume_at(Instant::now())
    }

    /// Same as [`try_consume`](Self::try_consume) against a caller-supplied
    /// clock reading, which keeps the refill arithmetic testable without
    /// sleeping.
    pub(crate) fn try_consume_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.available = (self.available + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        self.last_refill = now;

        if self.available >= 1.0 {
            self.available -= 1.0;
            true
        } else {
            false
        }
    }
}
