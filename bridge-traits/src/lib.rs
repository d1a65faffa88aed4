//! # Host Bridge Traits
//!
//! Contracts between the playback core and the player widgets owned by the
//! host application.
//!
//! ## Overview
//!
//! The core never renders video itself. The host mounts one of two kinds of
//! player and hands the core a bridge object implementing the matching trait:
//!
//! | Trait | Player kind | Access model |
//! |-------|-------------|--------------|
//! | [`EmbeddedPlayerHost`](player::EmbeddedPlayerHost) | Third-party embedded player addressed by a video identifier | Asynchronous calls, event-driven readiness, fallible position reads, remountable |
//! | [`MediaElementHost`](player::MediaElementHost) | Native media element playing a direct media URL | Synchronous property access, readiness event after a source swap |
//!
//! Both bridges report lifecycle changes through a [`HostListener`](player::HostListener)
//! callback. The core adapts them into a single playback capability surface.
//!
//! ## Error Handling
//!
//! All bridge calls use [`BridgeError`](error::BridgeError). Implementations
//! should map widget-level failures (player not mounted, JavaScript bridge
//! rejected the call, element detached) to `OperationFailed` and reserve
//! `NotAvailable` for capabilities the host does not provide at all.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so bridge objects can be shared with
//! the scheduler task. Listener callbacks may be invoked from any thread.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::player::{HostListener, MediaElementHost};
//! use bridge_traits::error::Result;
//!
//! struct VideoViewBridge { /* handle to the platform view */ }
//!
//! impl MediaElementHost for VideoViewBridge {
//!     fn replace_source(&self, url: &str) -> Result<()> { /* ... */ }
//!     fn set_current_time(&self, seconds: f64) -> Result<()> { /* ... */ }
//!     fn current_time(&self) -> Result<f64> { /* ... */ }
//!     fn play(&self) -> Result<()> { /* ... */ }
//!     fn pause(&self) -> Result<()> { /* ... */ }
//!     fn is_playing(&self) -> bool { /* ... */ }
//!     fn set_listener(&self, listener: HostListener) { /* ... */ }
//! }
//! ```

pub mod error;
pub mod player;

pub use error::BridgeError;

pub use player::{
    EmbeddedPlayerHost, HostListener, HostPlayerState, HostSignal, MediaElementHost,
};
