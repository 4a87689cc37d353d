//! Dependency injection traits — currently just the clock.
//!
//! Every place the core touches the process clock (`firstSeen`/`lastSeen`,
//! the `newToday`/`newThisWeek` rollups, token issuance/expiry) takes a
//! `&dyn Clock` rather than calling `Utc::now()` directly, so tests can
//! supply a [`FixedClock`] and assert on exact day/week boundaries.

use chrono::{DateTime, Utc};

/// Abstracts time so deterministic tests don't race the wall clock.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
///
/// Always returns the same instant, so time-sensitive assertions (e.g.
/// "newToday counts issues first seen since midnight") don't flake.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a fixed clock pinned to `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let t = Utc::now();
        let clock = FixedClock::new(t);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), t);
    }
}
