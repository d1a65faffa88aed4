//! Runtime entry points for callers that are not already async.
//!
//! Host shells that embed the scheduler from synchronous code build a runtime
//! through [`Builder`] and keep it alive for the lifetime of the player screen.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Builds a multi-threaded runtime with timers and I/O enabled.
pub fn build() -> std::io::Result<Runtime> {
    Builder::new_multi_thread().enable_all().build()
}

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Returns an error when the runtime cannot be created instead of panicking.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Returns a handle to the runtime the caller is running on, if any.
pub fn current() -> Option<Handle> {
    Handle::try_current().ok()
}
