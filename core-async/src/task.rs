//! Task spawning abstractions.
//!
//! Long-lived service loops are spawned once and must not outlive the handle
//! that controls them. [`TaskGuard`] ties a spawned task's lifetime to a Rust
//! value: dropping the guard aborts the task.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::{self, TaskGuard};
//!
//! async fn example() {
//!     let guard = TaskGuard::new(task::spawn(async {
//!         loop {
//!             task::yield_now().await;
//!         }
//!     }));
//!     drop(guard); // the loop is aborted here
//! }
//! ```

pub use tokio::task::{yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current runtime.
///
/// # Panics
///
/// Panics when called outside of a Tokio runtime context.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Owns a spawned task and aborts it when dropped.
#[derive(Debug)]
pub struct TaskGuard<T> {
    handle: JoinHandle<T>,
}

impl<T> TaskGuard<T> {
    /// Wraps an existing join handle.
    pub fn new(handle: JoinHandle<T>) -> Self {
        Self { handle }
    }

    /// Returns `true` once the task has run to completion or been aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task to finish without aborting it.
    pub async fn join(&mut self) -> Result<T> {
        (&mut self.handle).await
    }
}

impl<T> Drop for TaskGuard<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
