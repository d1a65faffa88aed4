//! Time-related abstractions.
//!
//! All instants handed out by this module come from Tokio's clock, so code
//! that schedules deadlines with [`Instant::now`] observes the paused clock in
//! `#[tokio::test(start_paused = true)]` tests exactly like production code
//! observes wall time.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{ticker, Duration};
//!
//! async fn poll_every_200ms() {
//!     let mut ticks = ticker(Duration::from_millis(200));
//!     for _ in 0..3 {
//!         ticks.tick().await;
//!     }
//! }
//! ```

pub use std::time::Duration;
pub use tokio::time::{
    interval, interval_at, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior,
    Sleep, Timeout,
};

/// Error returned by [`timeout`] when the deadline elapses first.
pub use tokio::time::error::Elapsed;

/// Creates a fixed-period ticker suitable for polling loops.
///
/// Unlike a bare [`interval`], the first tick fires one full `period` after
/// creation rather than immediately, and ticks missed while the owner was busy
/// are skipped instead of being delivered in a burst. A sampling loop never
/// sees several back-to-back ticks after a slow iteration.
///
/// # Panics
///
/// Panics if `period` is zero, matching [`interval`].
pub fn ticker(period: Duration) -> Interval {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticks
}

/// Returns the deadline `delay` from now on the runtime clock.
pub fn deadline_after(delay: Duration) -> Instant {
    Instant::now() + delay
}

/// Converts fractional seconds into a [`Duration`], clamping negative and
/// non-finite input to zero.
pub fn secs_f64(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}
