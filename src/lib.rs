//! Workspace facade crate.
//!
//! Host applications can depend on `reel-workspace` alone and reach the
//! segment playback scheduler and its runtime support through the re-exports
//! below instead of wiring each member crate individually.

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "playback")]
pub use core_runtime as runtime;
