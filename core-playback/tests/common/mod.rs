//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use core_async::time::Instant;
use core_playback::adapter::{ReadyCallback, ResumeCallback};
use core_playback::models::PlaybackTarget;
use core_playback::{BackendAdapter, Range, Result, SourceEntry, SourceKind, VideoSource};
use core_runtime::events::{CoreEvent, EventStream};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Fake backend
// ============================================================================

/// Commands received by a [`FakeBackend`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    Load(String),
    SeekAndPlay(f64),
    Pause,
    PauseAt(f64),
    Remount,
}

struct Inner {
    ready: bool,
    ready_on_load: bool,
    stubborn: bool,
    readable: bool,
    loaded: Option<String>,
    base: f64,
    playing_since: Option<Instant>,
    log: Vec<Cmd>,
    waiters: Vec<ReadyCallback>,
    resumed: Option<ResumeCallback>,
}

/// In-memory player whose position advances with the runtime clock while
/// playing.
///
/// Unlike real adapters it keeps every readiness callback registered for a
/// load, so stale registrations fire too and have to be filtered by the
/// scheduler.
pub struct FakeBackend {
    kind: SourceKind,
    resumes: bool,
    inner: Mutex<Inner>,
}

impl FakeBackend {
    fn new(kind: SourceKind, resumes: bool) -> Self {
        Self {
            kind,
            resumes,
            inner: Mutex::new(Inner {
                ready: false,
                ready_on_load: true,
                stubborn: false,
                readable: true,
                loaded: None,
                base: 0.0,
                playing_since: None,
                log: Vec::new(),
                waiters: Vec::new(),
                resumed: None,
            }),
        }
    }

    /// Media element style backend: reliable pause, no remount.
    pub fn direct() -> Self {
        Self::new(SourceKind::Direct, false)
    }

    /// Embedded player style backend: may resume after pause.
    pub fn embedded() -> Self {
        Self::new(SourceKind::Embedded, true)
    }

    /// Loads only become ready through [`fire_ready`](Self::fire_ready).
    pub fn deferred_ready(self) -> Self {
        self.inner.lock().ready_on_load = false;
        self
    }

    /// Pause and remount commands are recorded but have no effect.
    pub fn stubborn(self) -> Self {
        self.inner.lock().stubborn = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn fire_ready(&self) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.ready = true;
            std::mem::take(&mut inner.waiters)
        };
        for callback in waiters {
            callback();
        }
    }

    pub fn fire_resumed(&self) {
        let callback = self.inner.lock().resumed.clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Jumps the playhead, keeping the play state.
    pub fn set_position(&self, seconds: f64) {
        let mut inner = self.inner.lock();
        inner.base = seconds;
        if inner.playing_since.is_some() {
            inner.playing_since = Some(Instant::now());
        }
    }

    pub fn set_readable(&self, readable: bool) {
        self.inner.lock().readable = readable;
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().playing_since.is_some()
    }

    pub fn log(&self) -> Vec<Cmd> {
        self.inner.lock().log.clone()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.log()
            .into_iter()
            .filter_map(|cmd| match cmd {
                Cmd::SeekAndPlay(seconds) => Some(seconds),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Cmd) -> usize {
        self.log()
            .iter()
            .filter(|cmd| std::mem::discriminant(*cmd) == std::mem::discriminant(wanted))
            .count()
    }

    fn position(inner: &Inner) -> f64 {
        match inner.playing_since {
            Some(since) => inner.base + since.elapsed().as_secs_f64(),
            None => inner.base,
        }
    }

    fn stop_at(inner: &mut Inner, seconds: f64) {
        if !inner.stubborn {
            inner.base = seconds;
            inner.playing_since = None;
        }
    }
}

#[async_trait]
impl BackendAdapter for FakeBackend {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn load(&self, source: &VideoSource) -> Result<()> {
        let target = source.resolve_target()?;
        let key = match target {
            PlaybackTarget::Url(url) => url,
            PlaybackTarget::EmbedId(id) => id,
        };

        let mut inner = self.inner.lock();
        inner.log.push(Cmd::Load(source.id.clone()));
        if inner.loaded.as_deref() != Some(key.as_str()) {
            inner.loaded = Some(key);
            inner.ready = inner.ready_on_load;
            inner.waiters.clear();
            inner.playing_since = None;
            inner.base = 0.0;
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }

    async fn seek_and_play(&self, seconds: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.push(Cmd::SeekAndPlay(seconds));
        if inner.ready {
            inner.base = seconds;
            inner.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn current_position(&self) -> Option<f64> {
        let inner = self.inner.lock();
        inner.readable.then(|| Self::position(&inner))
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.push(Cmd::Pause);
        let position = Self::position(&inner);
        Self::stop_at(&mut inner, position);
        Ok(())
    }

    async fn pause_at(&self, stop_sec: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.push(Cmd::PauseAt(stop_sec));
        Self::stop_at(&mut inner, stop_sec);
        Ok(())
    }

    fn on_ready(&self, callback: ReadyCallback) {
        let fire_now = {
            let mut inner = self.inner.lock();
            if inner.ready {
                Some(callback)
            } else {
                inner.waiters.push(callback);
                None
            }
        };
        if let Some(callback) = fire_now {
            callback();
        }
    }

    fn on_resumed(&self, callback: ResumeCallback) {
        self.inner.lock().resumed = Some(callback);
    }

    fn resumes_after_pause(&self) -> bool {
        self.resumes
    }

    async fn remount(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.log.push(Cmd::Remount);
        Self::stop_at(&mut inner, 0.0);
        Ok(())
    }
}

// ============================================================================
// Input builders
// ============================================================================

pub fn range(id: &str, video_id: &str, start: f64, end: f64, labels: &[&str]) -> Range {
    Range::new(id, video_id, start, end, labels.iter().copied()).unwrap()
}

pub fn direct_source(video_id: &str) -> (String, SourceEntry) {
    (
        video_id.to_string(),
        SourceEntry::new(VideoSource::direct(
            video_id,
            format!("https://cdn.example.com/{video_id}.mp4"),
        )),
    )
}

pub fn embedded_source(video_id: &str, locator: &str) -> (String, SourceEntry) {
    (
        video_id.to_string(),
        SourceEntry::new(VideoSource::embedded(video_id, locator)),
    )
}

pub fn sources<const N: usize>(entries: [(String, SourceEntry); N]) -> HashMap<String, SourceEntry> {
    HashMap::from(entries)
}

// ============================================================================
// Event helpers
// ============================================================================

/// Everything currently buffered on `stream`.
pub fn drain(stream: &mut EventStream) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        events.push(event);
    }
    events
}
