//! # Core Runtime Module
//!
//! Provides the runtime infrastructure shared by the playback core:
//! - Logging and tracing infrastructure
//! - Event bus system for scheduler notifications
//!
//! ## Overview
//!
//! The scheduler reports everything a host needs to bind its UI to (clip
//! advances, the end of a traversal, skipped clips, finalization warnings)
//! through the [`events::EventBus`]. Diagnostics go through `tracing`, set up
//! once per process by [`logging::init_logging`].

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
