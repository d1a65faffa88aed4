//! # Segment Playback Module
//!
//! Plays labeled time ranges of one or more videos back to back as a single
//! highlight reel.
//!
//! ## Overview
//!
//! This module handles:
//! - Deriving an ordered clip playlist from labeled ranges and a label selection
//! - Driving embedded and direct players through a uniform backend adapter
//! - Detecting clip boundaries from sampled positions and advancing
//! - Making the stop at the end of the reel hold on unreliable players
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{BackendSet, DirectBackend, SchedulerConfig, SchedulerService, Selection};
//! use core_runtime::events::EventBus;
//!
//! let backends = BackendSet::new().with(Arc::new(DirectBackend::new(element)));
//! let handle = SchedulerService::spawn(SchedulerConfig::default(), backends, EventBus::default())?;
//! handle.set_playlist(inputs.ranges, Selection::any(["goal"]), inputs.sources).await?;
//! ```

pub mod adapter;
pub mod clip_index;
pub mod config;
pub mod error;
pub mod feed;
pub mod finalization;
pub mod locator;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod watcher;

pub use adapter::{BackendAdapter, BackendSet, DirectBackend, EmbeddedBackend};
pub use clip_index::ClipIndex;
pub use config::SchedulerConfig;
pub use error::{PlaybackError, Result};
pub use feed::{gather, PlaylistInputs, ProjectVideo, RangeFeed, SourceRegistry};
pub use models::{
    Clip, ClipKey, MatchMode, PlaybackState, Playlist, Range, SchedulerStatus, Selection,
    SourceEntry, SourceKind, VideoSource,
};
pub use scheduler::{SchedulerInput, SegmentScheduler};
pub use service::{SchedulerHandle, SchedulerService};
