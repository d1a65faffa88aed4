//! # Backend Adapters
//!
//! A single capability surface over the two player families the host can
//! provide. The scheduler only ever talks to [`BackendAdapter`]; the concrete
//! adapters translate those calls into host bridge commands.
//!
//! | Adapter | Host bridge | Readiness | Position read | Pause sticks |
//! |---------|-------------|-----------|---------------|--------------|
//! | [`EmbeddedBackend`] | [`EmbeddedPlayerHost`](bridge_traits::EmbeddedPlayerHost) | after mount | async, may fail | not always |
//! | [`DirectBackend`] | [`MediaElementHost`](bridge_traits::MediaElementHost) | after source swap | sync, only while playing | yes |
//!
//! ## Contract
//!
//! - `seek_and_play` issued before `is_ready()` may be silently dropped by the
//!   host. Callers that need it to land register [`BackendAdapter::on_ready`]
//!   and retry from the callback.
//! - `current_position` returns `None` for "unknown, skip this sample". It
//!   never reports a made-up `0`.
//! - `pause` is best effort. Backends whose players are known to resume on
//!   their own report [`BackendAdapter::resumes_after_pause`] and support
//!   [`BackendAdapter::remount`].

mod direct;
mod embedded;

pub use direct::DirectBackend;
pub use embedded::EmbeddedBackend;

use crate::error::{PlaybackError, Result};
use crate::models::{SourceKind, VideoSource};
use async_trait::async_trait;
use bridge_traits::HostListener;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One-shot readiness callback.
pub type ReadyCallback = Box<dyn FnOnce() + Send>;

/// Callback raised when a player reports that it started advancing.
pub type ResumeCallback = Arc<dyn Fn() + Send + Sync>;

/// Uniform playback capability over a concrete player.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// The source kind this adapter plays.
    fn kind(&self) -> SourceKind;

    /// Prepares the backend for `source`. Loading the source that is already
    /// loaded is a no-op and keeps the current readiness.
    async fn load(&self, source: &VideoSource) -> Result<()>;

    /// Whether `seek_and_play` can be trusted to take effect immediately.
    fn is_ready(&self) -> bool;

    /// Seeks to `seconds` and starts playback. Best effort before readiness.
    async fn seek_and_play(&self, seconds: f64) -> Result<()>;

    /// Current position, or `None` when it cannot be read right now.
    async fn current_position(&self) -> Option<f64>;

    async fn pause(&self) -> Result<()>;

    /// Stops at the terminal boundary `stop_sec`.
    async fn pause_at(&self, stop_sec: f64) -> Result<()> {
        let _ = stop_sec;
        self.pause().await
    }

    /// Registers `callback` for the next readiness signal of the current
    /// load, replacing any earlier registration. Fires immediately when the
    /// backend is already ready.
    fn on_ready(&self, callback: ReadyCallback);

    /// Registers a callback for "player started advancing" reports.
    fn on_resumed(&self, callback: ResumeCallback) {
        let _ = callback;
    }

    /// `true` for players known to resume after a pause command.
    fn resumes_after_pause(&self) -> bool {
        false
    }

    /// Tears the player down and mounts the current source again.
    async fn remount(&self) -> Result<()> {
        Err(PlaybackError::Unsupported(format!(
            "remount on {} backend",
            self.kind()
        )))
    }
}

/// The adapters available to a scheduler, one per source kind.
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: HashMap<SourceKind, Arc<dyn BackendAdapter>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `backend` under its own kind, replacing a previous one.
    pub fn with(mut self, backend: Arc<dyn BackendAdapter>) -> Self {
        self.insert(backend);
        self
    }

    pub fn insert(&mut self, backend: Arc<dyn BackendAdapter>) {
        self.backends.insert(backend.kind(), backend);
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn BackendAdapter>> {
        self.backends.get(&kind).cloned()
    }

    /// Looks up the adapter for `kind`, failing with
    /// [`PlaybackError::MissingBackend`].
    pub fn require(&self, kind: SourceKind) -> Result<Arc<dyn BackendAdapter>> {
        self.get(kind)
            .ok_or_else(|| PlaybackError::MissingBackend(kind.to_string()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = SourceKind> + '_ {
        self.backends.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.kinds().collect();
        kinds.sort();
        f.debug_struct("BackendSet").field("kinds", &kinds).finish()
    }
}

// ============================================================================
// Readiness bookkeeping shared by both adapters
// ============================================================================

/// Tracks readiness of the current load and the callbacks waiting for it.
///
/// Host listeners may run on any thread, so callbacks are always invoked
/// after the lock is released.
#[derive(Default)]
pub(crate) struct ReadyLatch {
    inner: Mutex<LatchState>,
}

#[derive(Default)]
struct LatchState {
    ready: bool,
    waiter: Option<ReadyCallback>,
    resumed: Option<ResumeCallback>,
}

impl ReadyLatch {
    pub(crate) fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }

    /// Starts a new load generation: not ready, no waiter.
    pub(crate) fn reset(&self) {
        let mut state = self.inner.lock();
        state.ready = false;
        state.waiter = None;
    }

    pub(crate) fn mark_ready(&self) {
        let waiter = {
            let mut state = self.inner.lock();
            state.ready = true;
            state.waiter.take()
        };
        if let Some(callback) = waiter {
            callback();
        }
    }

    pub(crate) fn register(&self, callback: ReadyCallback) {
        let fire_now = {
            let mut state = self.inner.lock();
            if state.ready {
                Some(callback)
            } else {
                state.waiter = Some(callback);
                None
            }
        };
        if let Some(callback) = fire_now {
            callback();
        }
    }

    pub(crate) fn set_resumed(&self, callback: ResumeCallback) {
        self.inner.lock().resumed = Some(callback);
    }

    pub(crate) fn notify_resumed(&self) {
        let callback = self.inner.lock().resumed.clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Host listener feeding this latch.
    pub(crate) fn listener(self: &Arc<Self>) -> HostListener {
        let latch = Arc::downgrade(self);
        Arc::new(move |signal| {
            let Some(latch) = latch.upgrade() else {
                return;
            };
            match signal {
                bridge_traits::HostSignal::Ready => latch.mark_ready(),
                bridge_traits::HostSignal::StateChanged(state) if state.is_advancing() => {
                    latch.notify_resumed()
                }
                bridge_traits::HostSignal::StateChanged(_) => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{HostPlayerState, HostSignal};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn latch_fires_waiter_once_on_ready() {
        let latch = Arc::new(ReadyLatch::default());
        let (count, bump) = counter();
        latch.register(Box::new(bump));

        let listener = latch.listener();
        listener(HostSignal::Ready);
        listener(HostSignal::Ready);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(latch.is_ready());
    }

    #[test]
    fn latch_fires_immediately_when_already_ready() {
        let latch = ReadyLatch::default();
        latch.mark_ready();
        let (count, bump) = counter();
        latch.register(Box::new(bump));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reset_drops_waiter() {
        let latch = ReadyLatch::default();
        let (count, bump) = counter();
        latch.register(Box::new(bump));
        latch.reset();
        latch.mark_ready();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn newer_registration_replaces_older() {
        let latch = ReadyLatch::default();
        let (first, bump_first) = counter();
        let (second, bump_second) = counter();
        latch.register(Box::new(bump_first));
        latch.register(Box::new(bump_second));
        latch.mark_ready();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn advancing_states_raise_resumed() {
        let latch = Arc::new(ReadyLatch::default());
        let (count, bump) = counter();
        latch.set_resumed(Arc::new(bump));

        let listener = latch.listener();
        listener(HostSignal::StateChanged(HostPlayerState::Paused));
        listener(HostSignal::StateChanged(HostPlayerState::Buffering));
        listener(HostSignal::StateChanged(HostPlayerState::Playing));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backend_set_reports_missing_kind() {
        let set = BackendSet::new();
        assert!(matches!(
            set.require(SourceKind::Direct),
            Err(PlaybackError::MissingBackend(_))
        ));
    }
}
