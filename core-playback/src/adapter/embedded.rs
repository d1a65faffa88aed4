use super::{BackendAdapter, ReadyCallback, ReadyLatch, ResumeCallback};
use crate::error::{PlaybackError, Result};
use crate::models::{PlaybackTarget, SourceKind, VideoSource};
use async_trait::async_trait;
use bridge_traits::EmbeddedPlayerHost;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Adapter over a third-party embedded player.
///
/// Loading mounts the player with the source's embed identifier; the player
/// becomes ready once the host reports [`HostSignal::Ready`](bridge_traits::HostSignal::Ready).
/// Consecutive clips of the same video reuse the mounted player.
pub struct EmbeddedBackend {
    host: Arc<dyn EmbeddedPlayerHost>,
    latch: Arc<ReadyLatch>,
    mounted: Mutex<Option<String>>,
}

impl EmbeddedBackend {
    pub fn new(host: Arc<dyn EmbeddedPlayerHost>) -> Self {
        let latch = Arc::new(ReadyLatch::default());
        host.set_listener(latch.listener());
        Self {
            host,
            latch,
            mounted: Mutex::new(None),
        }
    }

    /// Identifier of the currently mounted video.
    pub fn mounted_id(&self) -> Option<String> {
        self.mounted.lock().clone()
    }

    async fn mount(&self, embed_id: &str) -> Result<()> {
        self.latch.reset();
        *self.mounted.lock() = Some(embed_id.to_string());
        if let Err(e) = self.host.mount(embed_id).await {
            *self.mounted.lock() = None;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for EmbeddedBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Embedded
    }

    #[instrument(skip_all, fields(video = %source.id))]
    async fn load(&self, source: &VideoSource) -> Result<()> {
        let embed_id = match source.resolve_target()? {
            PlaybackTarget::EmbedId(id) => id,
            PlaybackTarget::Url(_) => {
                return Err(PlaybackError::Unplayable {
                    video_id: source.id.clone(),
                    reason: "direct source routed to embedded player".to_string(),
                })
            }
        };

        if self.mounted_id().as_deref() == Some(embed_id.as_str()) {
            debug!(embed_id = %embed_id, "Player already mounted");
            return Ok(());
        }

        debug!(embed_id = %embed_id, "Mounting embedded player");
        self.mount(&embed_id).await
    }

    fn is_ready(&self) -> bool {
        self.latch.is_ready()
    }

    async fn seek_and_play(&self, seconds: f64) -> Result<()> {
        self.host.seek_to(seconds, true).await?;
        self.host.set_playing(true).await?;
        Ok(())
    }

    async fn current_position(&self) -> Option<f64> {
        match self.host.current_time().await {
            Ok(seconds) if seconds.is_finite() => Some(seconds),
            Ok(seconds) => {
                debug!(seconds, "Discarding non-finite position");
                None
            }
            Err(e) => {
                debug!(error = %e, "Position unavailable");
                None
            }
        }
    }

    async fn pause(&self) -> Result<()> {
        self.host.set_playing(false).await?;
        Ok(())
    }

    fn on_ready(&self, callback: ReadyCallback) {
        self.latch.register(callback);
    }

    fn on_resumed(&self, callback: ResumeCallback) {
        self.latch.set_resumed(callback);
    }

    fn resumes_after_pause(&self) -> bool {
        true
    }

    #[instrument(skip_all)]
    async fn remount(&self) -> Result<()> {
        let embed_id = self
            .mounted_id()
            .ok_or_else(|| PlaybackError::command("remount", "no player mounted"))?;
        debug!(embed_id = %embed_id, "Remounting embedded player");
        self.mount(&embed_id).await
    }
}
