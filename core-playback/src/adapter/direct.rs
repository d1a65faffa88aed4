use super::{BackendAdapter, ReadyCallback, ReadyLatch};
use crate::error::{PlaybackError, Result};
use crate::models::{PlaybackTarget, SourceKind, VideoSource};
use async_trait::async_trait;
use bridge_traits::MediaElementHost;
use core_runtime::logging::redact_locator;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Adapter over a native media element playing direct media URLs.
///
/// Position reads are synchronous but only trusted while the element is
/// playing; a paused or still-loading element reports `None`.
pub struct DirectBackend {
    host: Arc<dyn MediaElementHost>,
    latch: Arc<ReadyLatch>,
    loaded: Mutex<Option<String>>,
}

impl DirectBackend {
    pub fn new(host: Arc<dyn MediaElementHost>) -> Self {
        let latch = Arc::new(ReadyLatch::default());
        host.set_listener(latch.listener());
        Self {
            host,
            latch,
            loaded: Mutex::new(None),
        }
    }

    /// URL of the currently loaded source.
    pub fn loaded_url(&self) -> Option<String> {
        self.loaded.lock().clone()
    }
}

#[async_trait]
impl BackendAdapter for DirectBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Direct
    }

    #[instrument(skip_all, fields(video = %source.id))]
    async fn load(&self, source: &VideoSource) -> Result<()> {
        let url = match source.resolve_target()? {
            PlaybackTarget::Url(url) => url,
            PlaybackTarget::EmbedId(_) => {
                return Err(PlaybackError::Unplayable {
                    video_id: source.id.clone(),
                    reason: "embedded source routed to media element".to_string(),
                })
            }
        };

        if self.loaded_url().as_deref() == Some(url.as_str()) {
            return Ok(());
        }

        debug!(url = %redact_locator(&url), "Replacing media element source");
        self.latch.reset();
        self.host.replace_source(&url)?;
        *self.loaded.lock() = Some(url);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.latch.is_ready()
    }

    async fn seek_and_play(&self, seconds: f64) -> Result<()> {
        self.host.set_current_time(seconds)?;
        self.host.play()?;
        Ok(())
    }

    async fn current_position(&self) -> Option<f64> {
        if !self.host.is_playing() {
            return None;
        }
        self.host
            .current_time()
            .ok()
            .filter(|seconds| seconds.is_finite())
    }

    async fn pause(&self) -> Result<()> {
        self.host.pause()?;
        Ok(())
    }

    /// Snaps to the exact stop point before pausing.
    async fn pause_at(&self, stop_sec: f64) -> Result<()> {
        if let Err(e) = self.host.set_current_time(stop_sec) {
            debug!(error = %e, stop_sec, "Could not snap to stop point");
        }
        self.pause().await
    }

    fn on_ready(&self, callback: ReadyCallback) {
        self.latch.register(callback);
    }
}
