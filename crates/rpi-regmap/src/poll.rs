//! Bounded busy-flag polling.
//!
//! The clock generator reports start/stop completion only through the BUSY
//! bit of CM_GPnCTL. The transition is short and hardware-bounded, so the
//! default policy spins; a bound still applies so a stalled generator
//! surfaces as an error instead of hanging the caller.
//! [`PollPolicy::forever`] restores the unbounded spin.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long to wait for a hardware flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Maximum number of reads before giving up. `None` or `Some(0)` polls
    /// forever.
    pub max_polls: Option<u32>,
    /// Pause between reads. Zero spins with a CPU hint.
    pub backoff: Duration,
}

impl PollPolicy {
    /// Default bound: one million reads, no backoff.
    pub const DEFAULT_MAX_POLLS: u32 = 1_000_000;

    /// Spin without limit.
    #[must_use]
    pub const fn forever() -> Self {
        Self { max_polls: None, backoff: Duration::ZERO }
    }

    /// Spin at most `max_polls` reads. Zero is the same as [`forever`](Self::forever).
    #[must_use]
    pub const fn bounded(max_polls: u32) -> Self {
        if max_polls == 0 {
            return Self::forever();
        }
        Self { max_polls: Some(max_polls), backoff: Duration::ZERO }
    }

    /// The effective bound, with zero normalized to unbounded.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        self.max_polls.filter(|&max| max != 0)
    }

    /// Sleep `backoff` between reads.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Evaluate `done` until it returns true.
    ///
    /// Returns the number of reads performed.
    ///
    /// # Errors
    ///
    /// Returns [`PollExhausted`] once `max_polls` reads all returned false.
    pub fn poll_until(&self, mut done: impl FnMut() -> bool) -> Result<u32, PollExhausted> {
        let mut polls: u32 = 0;
        loop {
            polls = polls.saturating_add(1);
            if done() {
                return Ok(polls);
            }
            if self.limit().is_some_and(|max| polls >= max) {
                return Err(PollExhausted { polls });
            }
            if self.backoff.is_zero() {
                core::hint::spin_loop();
            } else {
                std::thread::sleep(self.backoff);
            }
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::bounded(Self::DEFAULT_MAX_POLLS)
    }
}

/// The poll bound was reached without the condition becoming true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollExhausted {
    /// Reads performed.
    pub polls: u32,
}
