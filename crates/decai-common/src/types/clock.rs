//! Clock - logical time source for the simulation
//!
//! Simulated years run in real seconds, so nothing reads the wall clock.
//! The driver owns a [`Clock`] and hands clones to the contracts it builds;
//! every clone observes the same time. Independent runs use independent
//! clocks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Logical time in seconds
pub type Timestamp = u64;

/// Shared, explicitly advanced time cell
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now: Arc<AtomicU64>,
}

impl Clock {
    /// Create a clock starting at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock starting at `t`
    pub fn starting_at(t: Timestamp) -> Self {
        let clock = Self::new();
        clock.set(t);
        clock
    }

    /// Currently set time
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }

    /// Move time forward by `delta` seconds, stopping at the end of time
    pub fn advance(&self, delta: u64) {
        // The closure never returns None
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(delta)));
    }

    /// Set the time returned by [`Clock::now`]
    pub fn set(&self, t: Timestamp) {
        self.now.store(t, Ordering::SeqCst);
    }
}

/// A delay measured from a record's submission time.
///
/// `Never` is greater than every `After`, so ordering two windows compares
/// their delays with "disabled" as infinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimWindow {
    /// Opens this many seconds after submission
    After(u64),
    /// Never opens
    #[default]
    Never,
}

impl ClaimWindow {
    /// Absolute time the window opens for a record submitted at `submitted_at`
    pub fn opens_at(&self, submitted_at: Timestamp) -> Option<Timestamp> {
        match self {
            ClaimWindow::After(delay) => Some(submitted_at.saturating_add(*delay)),
            ClaimWindow::Never => None,
        }
    }

    /// Whether the window is open at `now`
    pub fn is_open(&self, submitted_at: Timestamp, now: Timestamp) -> bool {
        self.opens_at(submitted_at).is_some_and(|t| now >= t)
    }
}

impl std::fmt::Display for ClaimWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClaimWindow::After(delay) => write!(f, "{}s", delay),
            ClaimWindow::Never => write!(f, "never"),
        }
    }
}
