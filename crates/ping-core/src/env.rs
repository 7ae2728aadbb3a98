//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system clocks. Production uses real time
//! through [`SystemEnv`]; tests pause and advance tokio's virtual clock, or
//! drive the state machines with hand-built instants.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

use chrono::{DateTime, Utc};

/// Monotonic instant usable by the state machines.
///
/// Implemented for `std::time::Instant` and `tokio::time::Instant`.
pub trait MonotonicInstant:
    Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = Self> + 'static
{
}

impl<T> MonotonicInstant for T where
    T: Copy
        + Ord
        + Debug
        + Send
        + Sync
        + Sub<Output = Duration>
        + Add<Duration, Output = T>
        + 'static
{
}

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `wall_clock()` is only used for display timestamps, never for ordering
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: MonotonicInstant;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time, used to stamp outgoing messages.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleeps until `deadline`.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (not protocol logic).
    fn sleep_until(&self, deadline: Self::Instant) -> impl Future<Output = ()> + Send;
}

/// Production environment backed by tokio's clock.
///
/// Uses `tokio::time::Instant` so that tests running with a paused runtime
/// observe virtual time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep_until(&self, deadline: Self::Instant) -> impl Future<Output = ()> + Send {
        tokio::time::sleep_until(deadline)
    }
}
