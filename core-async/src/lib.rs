//! Runtime abstraction layer for the highlight reel scheduler.
//!
//! Every other crate in the workspace takes its timers, task spawning and
//! synchronization primitives from here instead of depending on Tokio
//! directly. Keeping the executor behind one crate means the scheduler logic
//! never names a runtime type, and tests can drive time deterministically
//! through Tokio's paused clock.
//!
//! # Modules
//!
//! - `task`: Task spawning and abort-on-drop task guards
//! - `time`: Sleep, deadlines and fixed-period tickers
//! - `sync`: Channels, watch cells and locks
//! - `runtime`: Blocking entry point for synchronous callers
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

// Multiplexing macros for service loops.
pub use tokio::{pin, select};

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
