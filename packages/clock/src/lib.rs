//! Where the tracker reads the current time.
//!
//! Two subsystems compare timestamps against "now": connection-ID
//! validation (is the token's issue time inside the clock-skew window?)
//! and peer expiry (has this peer announced within its lifetime?).
//! Neither can be tested against the system clock, so every time read
//! goes through a clock type: [`Working`] in production, [`Stopped`] in
//! tests, where the clock can be pinned and advanced at will.
//!
//! Timestamps are [`DurationSinceUnixEpoch`] values: a duration since the
//! Unix Epoch, independent of the system time zone.
use std::cell::Cell;
use std::time::{Duration, SystemTime};

use swarm_tracker_primitives::DurationSinceUnixEpoch;

/// Source of the current timestamp.
pub trait Time {
    fn now() -> DurationSinceUnixEpoch;

    /// The timestamp `duration` ago, saturating at the Unix Epoch.
    ///
    /// The peer-store garbage collector derives its expiry cutoff this
    /// way: `now_sub(peer_lifetime)`.
    #[must_use]
    fn now_sub(duration: &Duration) -> DurationSinceUnixEpoch {
        Self::now().saturating_sub(*duration)
    }
}

/// The production clock: the system time.
pub struct Working;

impl Time for Working {
    fn now() -> DurationSinceUnixEpoch {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("the system clock should not be set before the Unix Epoch")
    }
}

/// The test clock: frozen until told otherwise.
///
/// The pinned time is thread-local, so parallel tests cannot race each
/// other's clocks. Every thread starts at the Unix Epoch.
pub struct Stopped;

thread_local! {
    static TEST_TIME: Cell<DurationSinceUnixEpoch> = const { Cell::new(DurationSinceUnixEpoch::ZERO) };
}

impl Time for Stopped {
    fn now() -> DurationSinceUnixEpoch {
        TEST_TIME.get()
    }
}

impl Stopped {
    /// Pins the clock to `at`.
    pub fn set(at: DurationSinceUnixEpoch) {
        TEST_TIME.set(at);
    }

    /// Rewinds the clock to the Unix Epoch.
    pub fn set_to_unix_epoch() {
        Self::set(DurationSinceUnixEpoch::ZERO);
    }

    /// Moves the clock forward by `by`.
    pub fn advance(by: Duration) {
        TEST_TIME.set(TEST_TIME.get().saturating_add(by));
    }
}
