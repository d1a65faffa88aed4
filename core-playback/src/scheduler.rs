//! # Segment Scheduler
//!
//! Drives sequential playback of a [`Playlist`] across backend adapters.
//!
//! ## State machine
//!
//! ```text
//!            play_from / playlist appears
//!   Idle ─────────────────────────────────▶ Seeking ──seek applied──▶ Playing
//!    ▲                                        ▲                        │
//!    │ playlist replaced (from any state)     └──boundary, not last────┤
//!    │                                                                 │ boundary, last
//!    │                                      Finished ◀──first check── AdvancePending
//! ```
//!
//! ## Generations
//!
//! Every clip entry and every playlist replacement bumps an epoch counter.
//! Readiness and resume callbacks carry the epoch they were registered
//! under and are dropped on arrival when it no longer matches, so a late
//! callback can never seek or pause on behalf of a clip that is gone.
//!
//! The scheduler itself is plain state plus async methods. It is meant to be
//! owned by a single task ([`SchedulerService`](crate::service::SchedulerService)),
//! which feeds it commands, backend callbacks, watcher ticks and guard deadlines
//! one at a time.

use crate::adapter::{BackendAdapter, BackendSet};
use crate::clip_index::ClipIndex;
use crate::config::SchedulerConfig;
use crate::error::{PlaybackError, Result};
use crate::finalization::{FinalizationGuard, GuardStep};
use crate::models::{
    Clip, ClipKey, PlaybackState, Playlist, Range, SchedulerStatus, Selection, SourceEntry,
    SourceKind,
};
use crate::watcher::{self, BoundaryWatcher, Observation, Settle};
use core_async::sync::{mpsc, watch};
use core_async::time::Instant;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, PlaylistEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, trace, warn};

/// Backend callback delivered to the scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerInput {
    /// The backend of `kind` became ready for the load made during `epoch`.
    Ready { kind: SourceKind, epoch: u64 },
    /// The backend of `kind` reported that it started advancing.
    Resumed { kind: SourceKind, epoch: u64 },
}

/// A seek waiting for its backend to become ready.
#[derive(Debug, Clone, PartialEq)]
struct PendingSeek {
    clip: ClipKey,
    kind: SourceKind,
    target_sec: f64,
}

pub struct SegmentScheduler {
    config: SchedulerConfig,
    index: ClipIndex,
    backends: BackendSet,
    events: EventBus,
    inputs: mpsc::UnboundedSender<SchedulerInput>,
    status: watch::Sender<SchedulerStatus>,

    playlist: Playlist,
    state: PlaybackState,
    current: Option<usize>,
    epoch: u64,
    pending_seek: Option<PendingSeek>,
    active_kind: Option<SourceKind>,
    unplayable: HashSet<ClipKey>,
    last_played: Option<usize>,
    watcher: BoundaryWatcher,
    guard: Option<FinalizationGuard>,
}

impl SegmentScheduler {
    /// Creates an idle scheduler.
    ///
    /// Returns the receiving end of the backend callback channel; everything
    /// read from it must be passed to [`handle_input`](Self::handle_input).
    pub fn new(
        config: SchedulerConfig,
        backends: BackendSet,
        events: EventBus,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SchedulerInput>)> {
        config.validate()?;
        if backends.is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "at least one backend is required".to_string(),
            ));
        }

        let (inputs, input_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SchedulerStatus::default());
        let scheduler = Self {
            index: ClipIndex::from_config(&config),
            config,
            backends,
            events,
            inputs,
            status,
            playlist: Playlist::empty(),
            state: PlaybackState::Idle,
            current: None,
            epoch: 0,
            pending_seek: None,
            active_kind: None,
            unplayable: HashSet::new(),
            last_played: None,
            watcher: BoundaryWatcher::new(),
            guard: None,
        };
        Ok((scheduler, input_rx))
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            state: self.state,
            current_index: self.current,
            playlist_len: self.playlist.len(),
        }
    }

    /// Receiver observing every status change.
    pub fn watch_status(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether a seek is waiting for backend readiness.
    pub fn has_pending_seek(&self) -> bool {
        self.pending_seek.is_some()
    }

    /// Whether boundary ticks should be delivered.
    pub fn is_watching(&self) -> bool {
        self.state == PlaybackState::Playing && self.watcher.is_active()
    }

    /// When [`run_guard`](Self::run_guard) is next due.
    pub fn guard_deadline(&self) -> Option<Instant> {
        self.guard.as_ref().and_then(FinalizationGuard::deadline)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Rebuilds the playlist and returns to `Idle`.
    ///
    /// Playback starts from the first clip automatically when the previous
    /// playlist was empty and the new one is not.
    #[instrument(skip_all, fields(ranges = ranges.len(), mode = %selection.mode))]
    pub async fn set_playlist(
        &mut self,
        ranges: &[Range],
        selection: &Selection,
        sources: &HashMap<String, SourceEntry>,
    ) {
        let playlist = self.index.build(ranges, selection, sources);
        let was_empty = self.playlist.is_empty();

        self.reset_to_idle().await;
        self.playlist = playlist;
        self.unplayable.clear();
        self.publish();

        let clip_count = self.playlist.len();
        info!(clips = clip_count, "Playlist replaced");
        self.emit(CoreEvent::Playlist(PlaylistEvent::Rebuilt {
            clip_count,
            mode: selection.mode.to_string(),
        }));

        if was_empty && clip_count > 0 {
            self.enter_clip(0).await;
        }
    }

    /// Starts playback at `index`, from any state.
    #[instrument(skip(self))]
    pub async fn play_from(&mut self, index: usize) -> Result<()> {
        let len = self.playlist.len();
        if index >= len {
            return Err(PlaybackError::InvalidIndex { index, len });
        }

        self.guard = None;
        self.last_played = None;
        self.enter_clip(index).await;
        Ok(())
    }

    /// Stops playback and returns to `Idle`, keeping the playlist.
    pub async fn stop(&mut self) {
        self.reset_to_idle().await;
        self.publish();
    }

    /// Applies a backend callback.
    pub async fn handle_input(&mut self, input: SchedulerInput) {
        match input {
            SchedulerInput::Ready { kind, epoch } => self.on_backend_ready(kind, epoch).await,
            SchedulerInput::Resumed { kind, epoch } => self.on_backend_resumed(kind, epoch).await,
        }
    }

    /// Samples the active backend once and advances on a reached boundary.
    pub async fn tick(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(backend) = self.active_backend() else {
            return;
        };

        let epoch = self.epoch;
        let position = backend.current_position().await;
        match self.watcher.observe(epoch, position) {
            Observation::Reached => self.on_boundary_reached().await,
            Observation::Unreadable => trace!(epoch, "Position unreadable, skipping tick"),
            Observation::Unsettled => trace!(epoch, ?position, "Seek not landed yet"),
            Observation::Before | Observation::Inactive => {}
        }
    }

    /// Runs the finalization guard if its deadline has passed.
    pub async fn run_guard(&mut self) {
        let Some(mut guard) = self.guard.take() else {
            return;
        };
        if guard.epoch() != self.epoch {
            debug!(guard_epoch = guard.epoch(), epoch = self.epoch, "Dropping stale guard");
            return;
        }
        let Some(backend) = self.active_backend() else {
            return;
        };

        let step = guard.run(backend.as_ref()).await;
        self.apply_guard_step(&guard, step);
        self.guard = Some(guard);
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    async fn reset_to_idle(&mut self) {
        self.epoch += 1;
        self.watcher.disarm();
        self.pending_seek = None;
        self.guard = None;
        self.last_played = None;
        self.pause_active().await;
        self.state = PlaybackState::Idle;
        self.current = None;
    }

    /// Enters the first playable clip at or after `start`.
    async fn enter_clip(&mut self, start: usize) {
        let mut index = start;
        while let Some(clip) = self.playlist.get(index).cloned() {
            match self.start_clip(index, &clip).await {
                Ok(()) => return,
                Err(e) => {
                    self.mark_unplayable(&clip, &e);
                    index += 1;
                }
            }
        }
        self.exhausted().await;
    }

    async fn start_clip(&mut self, index: usize, clip: &Clip) -> Result<()> {
        let kind = clip.kind();
        let backend = self.backends.require(kind)?;

        self.epoch += 1;
        self.watcher.disarm();
        self.pending_seek = None;
        self.switch_backend(kind).await;
        self.current = Some(index);
        self.state = PlaybackState::Seeking;
        self.publish();

        backend.load(&clip.source).await?;

        let target_sec = watcher::start_position(clip, self.config.start_margin_sec);
        if backend.is_ready() {
            self.apply_seek(backend.as_ref(), index, clip, target_sec)
                .await?;
        } else {
            debug!(clip = %clip.key(), target_sec, epoch = self.epoch, "Backend not ready, deferring seek");
            self.pending_seek = Some(PendingSeek {
                clip: clip.key(),
                kind,
                target_sec,
            });
            let inputs = self.inputs.clone();
            let epoch = self.epoch;
            backend.on_ready(Box::new(move || {
                let _ = inputs.send(SchedulerInput::Ready { kind, epoch });
            }));
        }

        self.emit(CoreEvent::Playback(PlaybackEvent::Advanced {
            index,
            clip_id: clip.range_id.clone(),
        }));
        Ok(())
    }

    async fn apply_seek(
        &mut self,
        backend: &dyn BackendAdapter,
        index: usize,
        clip: &Clip,
        target_sec: f64,
    ) -> Result<()> {
        backend.seek_and_play(target_sec).await?;

        let stop_sec =
            watcher::stop_boundary(clip, self.is_final(index), self.config.end_margin_sec);
        self.watcher.arm(
            clip.key(),
            self.epoch,
            target_sec,
            stop_sec,
            Settle::new(
                self.config.settle_tolerance_sec,
                self.config.settle_max_samples,
            ),
        );
        self.state = PlaybackState::Playing;
        self.last_played = Some(index);
        self.publish();

        debug!(index, clip = %clip.key(), target_sec, stop_sec, "Playing clip");
        Ok(())
    }

    async fn on_backend_ready(&mut self, kind: SourceKind, epoch: u64) {
        if epoch != self.epoch {
            debug!(%kind, epoch, current = self.epoch, "Discarding stale readiness");
            return;
        }
        let Some(pending) = self.pending_seek.take() else {
            return;
        };
        let Some((index, clip)) = self.current_clip() else {
            return;
        };
        if pending.kind != kind || pending.clip != clip.key() {
            debug!(clip = %pending.clip, "Discarding seek for a clip that is no longer current");
            return;
        }
        let Some(backend) = self.backends.get(kind) else {
            return;
        };

        if let Err(e) = self
            .apply_seek(backend.as_ref(), index, &clip, pending.target_sec)
            .await
        {
            self.mark_unplayable(&clip, &e);
            self.enter_clip(index + 1).await;
        }
    }

    async fn on_backend_resumed(&mut self, kind: SourceKind, epoch: u64) {
        if epoch != self.epoch || self.active_kind != Some(kind) {
            return;
        }
        if !matches!(
            self.state,
            PlaybackState::AdvancePending | PlaybackState::Finished
        ) {
            return;
        }
        let Some(mut guard) = self.guard.take() else {
            return;
        };
        let Some(backend) = self.backends.get(kind) else {
            self.guard = Some(guard);
            return;
        };

        debug!(clip = guard.clip_id(), "Player resumed after finish");
        let step = guard.on_resumed(backend.as_ref()).await;
        self.apply_guard_step(&guard, step);
        self.guard = Some(guard);
    }

    async fn on_boundary_reached(&mut self) {
        let Some((index, clip)) = self.current_clip() else {
            return;
        };

        if !self.is_final(index) {
            debug!(index, clip = %clip.key(), "Boundary reached, advancing");
            self.enter_clip(index + 1).await;
            return;
        }
        self.report_remaining_unplayable(index);

        let Some(backend) = self.active_backend() else {
            return;
        };
        self.watcher.disarm();
        self.state = PlaybackState::AdvancePending;
        self.publish();

        let stop_sec = watcher::stop_boundary(&clip, true, self.config.end_margin_sec);
        info!(index, clip = %clip.key(), stop_sec, "Last clip reached, stopping");
        if let Err(e) = backend.pause_at(stop_sec).await {
            debug!(error = %e, "Terminal pause rejected");
        }

        let inputs = self.inputs.clone();
        let epoch = self.epoch;
        let kind = backend.kind();
        backend.on_resumed(Arc::new(move || {
            let _ = inputs.send(SchedulerInput::Resumed { kind, epoch });
        }));

        self.guard = Some(FinalizationGuard::new(
            clip.range_id.clone(),
            epoch,
            stop_sec,
            &self.config,
        ));
    }

    /// Nothing playable remains at or after the requested clip.
    async fn exhausted(&mut self) {
        self.watcher.disarm();
        self.pending_seek = None;
        self.pause_active().await;

        let last_played = self
            .last_played
            .and_then(|index| self.playlist.get(index).map(|clip| (index, clip.range_id.clone())));

        match last_played {
            Some((index, clip_id)) => {
                self.current = Some(index);
                self.state = PlaybackState::Finished;
                self.publish();
                self.emit(CoreEvent::Playback(PlaybackEvent::Finished { clip_id }));
            }
            None => {
                self.current = None;
                self.state = PlaybackState::Idle;
                self.publish();
                let clip_count = self
                    .playlist
                    .iter()
                    .filter(|clip| self.unplayable.contains(&clip.key()))
                    .count();
                if clip_count > 0 {
                    warn!(
                        clips = self.playlist.len(),
                        unplayable = clip_count,
                        "Nothing playable from the requested clip onward"
                    );
                    self.emit(CoreEvent::Playlist(PlaylistEvent::NoPlayableClips {
                        clip_count,
                    }));
                }
            }
        }
    }

    fn apply_guard_step(&mut self, guard: &FinalizationGuard, step: GuardStep) {
        let clip_id = guard.clip_id().to_string();
        match step {
            GuardStep::Corrected { remounted } => {
                self.emit(CoreEvent::Playback(PlaybackEvent::CorrectiveAction {
                    clip_id: clip_id.clone(),
                    remounted,
                }));
            }
            GuardStep::Warning(message) => {
                self.emit(CoreEvent::Playback(PlaybackEvent::FinalizationWarning {
                    clip_id: clip_id.clone(),
                    message,
                }));
            }
            GuardStep::Idle | GuardStep::Stopped | GuardStep::Verified | GuardStep::Repaused => {}
        }

        if self.state == PlaybackState::AdvancePending && guard.first_attempt_done() {
            self.state = PlaybackState::Finished;
            self.publish();
            self.emit(CoreEvent::Playback(PlaybackEvent::Finished { clip_id }));
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn current_clip(&self) -> Option<(usize, Clip)> {
        let index = self.current?;
        self.playlist.get(index).cloned().map(|clip| (index, clip))
    }

    /// Whether no clip after `index` can be played, so `index` ends the reel.
    fn is_final(&self, index: usize) -> bool {
        self.playlist
            .clips()
            .get(index + 1..)
            .map_or(true, |rest| rest.iter().all(|clip| !self.could_play(clip)))
    }

    fn could_play(&self, clip: &Clip) -> bool {
        !self.unplayable.contains(&clip.key()) && self.check_playable(clip).is_ok()
    }

    /// Failures knowable without touching a backend.
    fn check_playable(&self, clip: &Clip) -> Result<()> {
        self.backends.require(clip.kind())?;
        clip.source.resolve_target()?;
        Ok(())
    }

    /// Reports the clips after `index` that are skipped when `index` ends the reel.
    fn report_remaining_unplayable(&mut self, index: usize) {
        let rest: Vec<Clip> = self
            .playlist
            .clips()
            .get(index + 1..)
            .unwrap_or_default()
            .to_vec();
        for clip in rest {
            if self.unplayable.contains(&clip.key()) {
                continue;
            }
            if let Err(e) = self.check_playable(&clip) {
                self.mark_unplayable(&clip, &e);
            }
        }
    }

    fn active_backend(&self) -> Option<Arc<dyn BackendAdapter>> {
        self.active_kind.and_then(|kind| self.backends.get(kind))
    }

    async fn pause_active(&self) {
        if let Some(backend) = self.active_backend() {
            if let Err(e) = backend.pause().await {
                debug!(kind = %backend.kind(), error = %e, "Pause rejected");
            }
        }
    }

    /// Makes `kind` the active backend, pausing the previous one if it differs.
    async fn switch_backend(&mut self, kind: SourceKind) {
        if self.active_kind.is_some_and(|active| active != kind) {
            self.pause_active().await;
        }
        self.active_kind = Some(kind);
    }

    fn mark_unplayable(&mut self, clip: &Clip, error: &PlaybackError) {
        warn!(clip = %clip.key(), error = %error, "Skipping unplayable clip");
        self.unplayable.insert(clip.key());
        self.emit(CoreEvent::Playback(PlaybackEvent::Unplayable {
            clip_id: clip.range_id.clone(),
            reason: error.to_string(),
        }));
    }

    fn publish(&self) {
        self.status.send_replace(self.status());
    }

    fn emit(&self, event: CoreEvent) {
        if self.events.emit(event).is_err() {
            trace!("No event subscribers");
        }
    }
}

impl std::fmt::Debug for SegmentScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentScheduler")
            .field("state", &self.state)
            .field("current", &self.current)
            .field("playlist_len", &self.playlist.len())
            .field("epoch", &self.epoch)
            .field("active_kind", &self.active_kind)
            .finish()
    }
}
