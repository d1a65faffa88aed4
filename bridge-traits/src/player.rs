//! Player bridge traits and the signals host widgets raise.
//!
//! Host applications own the actual player views. These traits describe the
//! narrow command surface the playback core needs from each view, mirroring
//! what the underlying widgets can really do: the embedded player only talks
//! through asynchronous messages and may fail to answer, while the media
//! element exposes plain properties.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Player state as reported by a host widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlayerState {
    Unstarted,
    Buffering,
    Playing,
    Paused,
    Cued,
    Ended,
}

impl HostPlayerState {
    /// Returns `true` for states in which media is (or is about to be) advancing.
    pub fn is_advancing(&self) -> bool {
        matches!(self, HostPlayerState::Playing | HostPlayerState::Buffering)
    }
}

/// Notification raised by a host player widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// The currently mounted or loaded media can accept seek/play commands.
    Ready,
    /// The widget changed playback state.
    StateChanged(HostPlayerState),
}

/// Callback installed by the core to receive [`HostSignal`]s.
///
/// Hosts may invoke it from any thread and must not hold internal locks
/// while doing so.
pub type HostListener = Arc<dyn Fn(HostSignal) + Send + Sync>;

/// Bridge to an embedded third-party player addressed by a video identifier.
///
/// Every call is a message to the widget and may be rejected or silently
/// ignored, most notably seeks issued before [`HostSignal::Ready`] and pauses
/// on devices where the widget resumes on its own.
#[async_trait]
pub trait EmbeddedPlayerHost: Send + Sync {
    /// Mount the player for `video_id`. Mounting the same identifier again
    /// tears the widget down and creates a fresh instance.
    async fn mount(&self, video_id: &str) -> Result<()>;

    /// Seek to `seconds`. `allow_seek_ahead` lets the widget fetch unbuffered data.
    async fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<()>;

    /// Request playback to start (`true`) or pause (`false`).
    async fn set_playing(&self, playing: bool) -> Result<()>;

    /// Ask the widget for its current position in seconds.
    async fn current_time(&self) -> Result<f64>;

    /// Install the listener that receives readiness and state changes.
    fn set_listener(&self, listener: HostListener);
}

/// Bridge to a native media element playing a direct media URL.
pub trait MediaElementHost: Send + Sync {
    /// Swap the element's source. The element raises [`HostSignal::Ready`]
    /// once the new source can be positioned.
    fn replace_source(&self, url: &str) -> Result<()>;

    /// Set the playback position in seconds.
    fn set_current_time(&self, seconds: f64) -> Result<()>;

    /// Read the playback position in seconds.
    fn current_time(&self) -> Result<f64>;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    /// Whether the element is currently playing.
    fn is_playing(&self) -> bool;

    /// Install the listener that receives readiness and state changes.
    fn set_listener(&self, listener: HostListener);
}
