//! # Scheduler Service
//!
//! Runs a [`SegmentScheduler`] on its own task and exposes it through a
//! cloneable [`SchedulerHandle`].
//!
//! The task is the only place scheduler state is touched. It multiplexes:
//!
//! - commands from handles (playlist replacement, jumps, shutdown)
//! - backend readiness and resume callbacks
//! - boundary ticks, only while a clip is actually playing
//! - the finalization guard deadline, only while one is pending
//!
//! Dropping the last handle aborts the task.

use crate::adapter::BackendSet;
use crate::config::SchedulerConfig;
use crate::error::{PlaybackError, Result};
use crate::models::{Playlist, Range, SchedulerStatus, Selection, SourceEntry};
use crate::scheduler::{SchedulerInput, SegmentScheduler};
use core_async::sync::{mpsc, oneshot, watch};
use core_async::task::{self, TaskGuard};
use core_async::time::{sleep_until, ticker, Instant};
use core_runtime::events::{EventBus, EventStream};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const COMMAND_QUEUE_DEPTH: usize = 32;

enum Command {
    SetPlaylist {
        ranges: Vec<Range>,
        selection: Selection,
        sources: HashMap<String, SourceEntry>,
        reply: oneshot::Sender<()>,
    },
    PlayFrom {
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Playlist {
        reply: oneshot::Sender<Playlist>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Spawns scheduler tasks.
pub struct SchedulerService;

impl SchedulerService {
    /// Starts a scheduler on the current runtime.
    ///
    /// Events are published on `events`; subscribe before issuing commands
    /// to observe every transition.
    pub fn spawn(
        config: SchedulerConfig,
        backends: BackendSet,
        events: EventBus,
    ) -> Result<SchedulerHandle> {
        let (scheduler, inputs) = SegmentScheduler::new(config, backends, events.clone())?;
        let status = scheduler.watch_status();
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);

        let task = task::spawn(run(scheduler, inputs, command_rx));
        info!("Segment scheduler started");

        Ok(SchedulerHandle {
            commands,
            status,
            events,
            _task: Arc::new(TaskGuard::new(task)),
        })
    }
}

/// Cloneable control surface for a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SchedulerStatus>,
    events: EventBus,
    _task: Arc<TaskGuard<()>>,
}

impl SchedulerHandle {
    /// Rebuilds the playlist from `ranges`, `selection` and `sources`.
    ///
    /// Resolves once the scheduler has applied the new playlist.
    pub async fn set_playlist(
        &self,
        ranges: Vec<Range>,
        selection: Selection,
        sources: HashMap<String, SourceEntry>,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetPlaylist {
            ranges,
            selection,
            sources,
            reply,
        })
        .await?;
        rx.await.map_err(|_| PlaybackError::ShutDown)
    }

    /// Starts playback at `index`.
    pub async fn play_from(&self, index: usize) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PlayFrom { index, reply }).await?;
        rx.await.map_err(|_| PlaybackError::ShutDown)?
    }

    /// Stops playback, keeping the playlist.
    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop { reply }).await?;
        rx.await.map_err(|_| PlaybackError::ShutDown)
    }

    /// Snapshot of the current playlist.
    pub async fn playlist(&self) -> Result<Playlist> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Playlist { reply }).await?;
        rx.await.map_err(|_| PlaybackError::ShutDown)
    }

    /// Latest published status.
    pub fn current_state(&self) -> SchedulerStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change.
    pub fn watch_state(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> EventStream {
        self.events.stream()
    }

    /// Pauses playback and stops the scheduler task.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| PlaybackError::ShutDown)
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::ShutDown)
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("status", &*self.status.borrow())
            .finish()
    }
}

async fn run(
    mut scheduler: SegmentScheduler,
    mut inputs: mpsc::UnboundedReceiver<SchedulerInput>,
    mut commands: mpsc::Receiver<Command>,
) {
    let mut ticks = ticker(scheduler.config().tick_interval());
    let mut watching = false;

    loop {
        let now_watching = scheduler.is_watching();
        if now_watching && !watching {
            ticks.reset();
        }
        watching = now_watching;
        let guard_deadline = scheduler.guard_deadline();

        core_async::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("All scheduler handles dropped");
                    scheduler.stop().await;
                    break;
                };
                if !handle_command(&mut scheduler, command).await {
                    break;
                }
            }
            Some(input) = inputs.recv() => scheduler.handle_input(input).await,
            _ = ticks.tick(), if watching => scheduler.tick().await,
            _ = sleep_until(guard_deadline.unwrap_or_else(Instant::now)), if guard_deadline.is_some() => {
                scheduler.run_guard().await;
            }
        }
    }

    info!("Segment scheduler stopped");
}

/// Applies one command; returns `false` when the loop should exit.
async fn handle_command(scheduler: &mut SegmentScheduler, command: Command) -> bool {
    match command {
        Command::SetPlaylist {
            ranges,
            selection,
            sources,
            reply,
        } => {
            scheduler.set_playlist(&ranges, &selection, &sources).await;
            let _ = reply.send(());
        }
        Command::PlayFrom { index, reply } => {
            let _ = reply.send(scheduler.play_from(index).await);
        }
        Command::Stop { reply } => {
            scheduler.stop().await;
            let _ = reply.send(());
        }
        Command::Playlist { reply } => {
            let _ = reply.send(scheduler.playlist().clone());
        }
        Command::Shutdown { reply } => {
            scheduler.stop().await;
            let _ = reply.send(());
            return false;
        }
    }
    true
}
