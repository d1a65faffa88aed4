//! # Highlight Reel Demo
//!
//! Plays a three-clip reel spread over an embedded video and a direct media
//! file, using simulated host players that advance with the wall clock.
//!
//! The simulated embedded player ignores its first pause command, the way
//! some real embedded players resume on their own, so the end of the run
//! shows the finalization guard stepping in.
//!
//! Run with: `cargo run --example highlight_demo --package core-playback`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    EmbeddedPlayerHost, HostListener, HostPlayerState, HostSignal, MediaElementHost,
};
use core_async::task;
use core_async::time::{sleep, timeout, Duration, Instant};
use core_playback::{
    gather, BackendSet, DirectBackend, EmbeddedBackend, PlaybackState, ProjectVideo, Range,
    RangeFeed, Result, SchedulerConfig, SchedulerService, Selection, SourceRegistry,
    VideoSource,
};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Simulated players
// ============================================================================

#[derive(Default)]
struct Playhead {
    base: f64,
    since: Option<Instant>,
}

impl Playhead {
    fn position(&self) -> f64 {
        self.base + self.since.map_or(0.0, |since| since.elapsed().as_secs_f64())
    }

    fn seek(&mut self, seconds: f64) {
        self.base = seconds;
        if self.since.is_some() {
            self.since = Some(Instant::now());
        }
    }

    fn set_playing(&mut self, playing: bool) {
        match (playing, self.since) {
            (true, None) => self.since = Some(Instant::now()),
            (false, Some(_)) => {
                self.base = self.position();
                self.since = None;
            }
            _ => {}
        }
    }
}

/// Embedded player that becomes ready shortly after mounting. The first pause
/// after each mount is ignored and followed by a "playing" report.
#[derive(Default)]
struct SimulatedEmbed {
    head: Mutex<Playhead>,
    listener: Mutex<Option<HostListener>>,
    ignore_next_pause: Mutex<bool>,
}

impl SimulatedEmbed {
    fn signal(&self, signal: HostSignal) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(signal);
        }
    }
}

#[async_trait]
impl EmbeddedPlayerHost for SimulatedEmbed {
    async fn mount(&self, video_id: &str) -> BridgeResult<()> {
        println!("  [embed] mounting {video_id}");
        *self.head.lock() = Playhead::default();
        *self.ignore_next_pause.lock() = true;
        sleep(Duration::from_millis(150)).await;
        self.signal(HostSignal::Ready);
        Ok(())
    }

    async fn seek_to(&self, seconds: f64, _allow_seek_ahead: bool) -> BridgeResult<()> {
        self.head.lock().seek(seconds);
        Ok(())
    }

    async fn set_playing(&self, playing: bool) -> BridgeResult<()> {
        if !playing && std::mem::take(&mut *self.ignore_next_pause.lock()) {
            println!("  [embed] pause ignored, resuming shortly");
            let listener = self.listener.lock().clone();
            task::spawn(async move {
                sleep(Duration::from_millis(500)).await;
                if let Some(listener) = listener {
                    listener(HostSignal::StateChanged(HostPlayerState::Playing));
                }
            });
            return Ok(());
        }
        self.head.lock().set_playing(playing);
        let state = if playing {
            HostPlayerState::Playing
        } else {
            HostPlayerState::Paused
        };
        self.signal(HostSignal::StateChanged(state));
        Ok(())
    }

    async fn current_time(&self) -> BridgeResult<f64> {
        Ok(self.head.lock().position())
    }

    fn set_listener(&self, listener: HostListener) {
        *self.listener.lock() = Some(listener);
    }
}

/// Media element that is ready as soon as its source is replaced.
#[derive(Default)]
struct SimulatedElement {
    head: Mutex<Playhead>,
    listener: Mutex<Option<HostListener>>,
}

impl MediaElementHost for SimulatedElement {
    fn replace_source(&self, _url: &str) -> BridgeResult<()> {
        println!("  [element] source replaced");
        *self.head.lock() = Playhead::default();
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(HostSignal::Ready);
        }
        Ok(())
    }

    fn set_current_time(&self, seconds: f64) -> BridgeResult<()> {
        self.head.lock().seek(seconds);
        Ok(())
    }

    fn current_time(&self) -> BridgeResult<f64> {
        Ok(self.head.lock().position())
    }

    fn play(&self) -> BridgeResult<()> {
        self.head.lock().set_playing(true);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.head.lock().set_playing(false);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.head.lock().since.is_some()
    }

    fn set_listener(&self, listener: HostListener) {
        *self.listener.lock() = Some(listener);
    }
}

// ============================================================================
// In-memory collaborators
// ============================================================================

struct DemoLibrary {
    ranges: HashMap<String, Vec<Range>>,
    sources: HashMap<String, VideoSource>,
}

#[async_trait]
impl RangeFeed for DemoLibrary {
    async fn ranges_for(&self, video_id: &str) -> Result<Vec<Range>> {
        Ok(self.ranges.get(video_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SourceRegistry for DemoLibrary {
    async fn resolve(&self, video_id: &str) -> Result<Option<VideoSource>> {
        Ok(self.sources.get(video_id).cloned())
    }
}

fn library() -> Result<DemoLibrary> {
    let ranges = HashMap::from([
        (
            "match".to_string(),
            vec![
                Range::new("kickoff", "match", 1.0, 2.0, ["build-up"])?,
                Range::new("goal", "match", 4.0, 5.5, ["goal", "build-up"])?,
            ],
        ),
        (
            "replay".to_string(),
            vec![
                Range::new("angle-2", "replay", 0.5, 1.5, ["goal"])?,
                Range::new("crowd", "replay", 3.0, 4.0, ["crowd"])?,
            ],
        ),
    ]);
    let sources = HashMap::from([
        (
            "match".to_string(),
            VideoSource::detect("match", "https://cdn.example.com/match.mp4?token=secret"),
        ),
        (
            "replay".to_string(),
            VideoSource::detect("replay", "https://youtu.be/dQw4w9WgXcQ"),
        ),
    ]);
    Ok(DemoLibrary { ranges, sources })
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_filter("core_playback=debug"),
    )?;

    println!("=== Highlight Reel Demo ===\n");

    let library = library()?;
    let project = [
        ProjectVideo::new("match").with_order(0),
        ProjectVideo::new("replay").with_order(1),
    ];
    let inputs = gather(&library, &library, &project).await?;
    println!("Labels available: {:?}\n", inputs.labels());

    let backends = BackendSet::new()
        .with(Arc::new(EmbeddedBackend::new(Arc::new(
            SimulatedEmbed::default(),
        ))))
        .with(Arc::new(DirectBackend::new(Arc::new(
            SimulatedElement::default(),
        ))));

    let config = SchedulerConfig::default();
    let events = config.event_bus();
    let handle = SchedulerService::spawn(config, backends, events)?;
    let mut events = handle.subscribe();

    let selection = Selection::any(["goal", "build-up"]);
    handle
        .set_playlist(inputs.ranges, selection, inputs.sources)
        .await?;

    let playlist = handle.playlist().await?;
    println!("Playlist ({} clips):", playlist.len());
    for (position, clip) in playlist.iter().enumerate() {
        println!("  {}", clip.summary(position));
    }
    println!();

    // Run until the guard has had its say or nothing happens for a while.
    let quiet_after = Duration::from_secs(3);
    while let Ok(Ok(event)) = timeout(quiet_after, events.recv()).await {
        println!("event: {}", event.description());
        if let CoreEvent::Playback(
            PlaybackEvent::FinalizationWarning { .. } | PlaybackEvent::CorrectiveAction { .. },
        ) = event
        {
            sleep(Duration::from_secs(1)).await;
            break;
        }
    }

    let status = handle.current_state();
    println!(
        "\nFinal state: {:?} at clip {:?} of {}",
        status.state, status.current_index, status.playlist_len
    );
    if status.state != PlaybackState::Finished {
        println!("Reel did not finish");
    }

    handle.shutdown().await?;
    Ok(())
}
