//! # Event Bus System
//!
//! Typed, broadcast-based notifications from the playback core to the host
//! application, built on `tokio::sync::broadcast` (through `core_async`).
//!
//! ## Overview
//!
//! - **Event Types**: [`PlaylistEvent`] for playlist rebuilds and
//!   [`PlaybackEvent`] for clip transitions and finalization outcomes
//! - **EventBus**: central broadcast channel the scheduler publishes on
//! - **EventStream**: receiver wrapper with predicate filtering
//!
//! ```text
//! ┌───────────────────┐     emit      ┌───────────┐    subscribe    ┌────────────┐
//! │ Segment Scheduler ├──────────────>│ EventBus  ├────────────────>│ Host UI    │
//! └───────────────────┘               │ (broadcast├────────────────>│ Test probe │
//!                                     └───────────┘                 └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Advanced {
//!     index: 1,
//!     clip_id: "r7".to_string(),
//! }))
//! .ok();
//!
//! assert!(matches!(
//!     rx.try_recv(),
//!     Ok(CoreEvent::Playback(PlaybackEvent::Advanced { index: 1, .. }))
//! ));
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   later events are still delivered.
//! - **`RecvError::Closed`**: every sender is gone, i.e. the scheduler shut down.
//!
//! Emitting with no subscribers returns an error that publishers ignore.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playlist derivation results
    Playlist(PlaylistEvent),
    /// Clip transitions and end-of-playlist handling
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playlist(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Unplayable { .. })
            | CoreEvent::Playback(PlaybackEvent::FinalizationWarning { .. })
            | CoreEvent::Playlist(PlaylistEvent::NoPlayableClips { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::CorrectiveAction { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::Finished { .. }) => EventSeverity::Info,
            CoreEvent::Playlist(PlaylistEvent::Rebuilt { clip_count: 0, .. }) => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playlist Events
// ============================================================================

/// Events raised when the playlist is derived again from its inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaylistEvent {
    /// A new playlist replaced the previous one and the scheduler is idle.
    /// `clip_count == 0` reports that the selection matched nothing.
    Rebuilt {
        clip_count: usize,
        /// Match mode the playlist was built with (`"all"` or `"any"`).
        mode: String,
    },
    /// Playback was requested but no clip from that point onward could be
    /// played. `clip_count` is how many clips were found unplayable.
    NoPlayableClips { clip_count: usize },
}

impl PlaylistEvent {
    fn description(&self) -> &str {
        match self {
            PlaylistEvent::Rebuilt { clip_count: 0, .. } => "No clips match the selection",
            PlaylistEvent::Rebuilt { .. } => "Playlist rebuilt",
            PlaylistEvent::NoPlayableClips { .. } => "No playable clips left",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to clip playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Playback moved into the clip at `index`.
    Advanced {
        /// Position of the clip in the current playlist.
        index: usize,
        /// Range id of the clip.
        clip_id: String,
    },
    /// The traversal ended: the last clip was stopped at its end, or nothing
    /// playable remained after the current clip.
    Finished { clip_id: String },
    /// The clip's source could not be loaded and was skipped.
    Unplayable {
        clip_id: String,
        /// Human-readable cause.
        reason: String,
    },
    /// The backend kept playing past the final stop point and was paused
    /// again (and remounted when `remounted` is set).
    CorrectiveAction { clip_id: String, remounted: bool },
    /// Playback could not be confirmed stopped after the corrective action.
    FinalizationWarning { clip_id: String, message: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Advanced { .. } => "Advanced to clip",
            PlaybackEvent::Finished { .. } => "Playlist finished",
            PlaybackEvent::Unplayable { .. } => "Clip unplayable",
            PlaybackEvent::CorrectiveAction { .. } => "Re-issued stop at playlist end",
            PlaybackEvent::FinalizationWarning { .. } => "Playback may not have stopped",
        }
    }

    /// Range id of the clip the event refers to.
    pub fn clip_id(&self) -> &str {
        match self {
            PlaybackEvent::Advanced { clip_id, .. }
            | PlaybackEvent::Finished { clip_id }
            | PlaybackEvent::Unplayable { clip_id, .. }
            | PlaybackEvent::CorrectiveAction { clip_id, .. }
            | PlaybackEvent::FinalizationWarning { clip_id, .. } => clip_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another publisher on the same channel. Each
/// [`subscribe`](EventBus::subscribe) call creates an independent receiver
/// that only sees events emitted afterwards.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Creates a new subscriber wrapped in an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with predicate filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity};
///
/// let bus = EventBus::new(16);
/// let warnings = bus
///     .stream()
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from this stream.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
