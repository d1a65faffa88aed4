//! # Playback Error Types
//!
//! Error types for playlist derivation and clip scheduling.
//!
//! Most failures in this crate are absorbed by the scheduler and surfaced as
//! events (a skipped clip, a finalization warning). The variants below are
//! what individual components return before that happens, plus the errors a
//! caller of the scheduler service can observe directly.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Input Errors
    // ========================================================================
    /// Range bounds are not a valid, non-empty interval.
    #[error("Invalid range {id}: start {start_sec}s, end {end_sec}s")]
    InvalidRange {
        id: String,
        start_sec: f64,
        end_sec: f64,
    },

    /// A locator could not be turned into something a backend can load.
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// The clip's source cannot be played by any configured backend.
    #[error("Unplayable source {video_id}: {reason}")]
    Unplayable { video_id: String, reason: String },

    /// `play_from` was called with an index outside the playlist.
    #[error("Clip index {index} out of bounds for playlist of {len}")]
    InvalidIndex { index: usize, len: usize },

    /// Configuration values failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// No backend adapter registered for a source kind.
    #[error("No backend registered for {0} sources")]
    MissingBackend(String),

    /// A backend command (load, seek, pause, remount) was rejected.
    #[error("Backend command '{command}' failed: {message}")]
    BackendCommand { command: String, message: String },

    /// The backend does not support the requested operation.
    #[error("Backend operation not supported: {0}")]
    Unsupported(String),

    /// Error reported by a host bridge.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Service Errors
    // ========================================================================
    /// Range feed or source registry failure.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// The scheduler task has stopped.
    #[error("Scheduler is shut down")]
    ShutDown,
}

impl PlaybackError {
    pub(crate) fn command(command: &str, message: impl Into<String>) -> Self {
        PlaybackError::BackendCommand {
            command: command.to_string(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::BackendCommand { .. } => true,
            PlaybackError::Bridge(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` if this error means the clip's source cannot be played.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidLocator(_)
                | PlaybackError::Unplayable { .. }
                | PlaybackError::MissingBackend(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
