//! # Finalization Guard
//!
//! Makes "stopped at the end of the last clip" hold on players whose pause
//! does not always stick.
//!
//! ```text
//!  pause_at(stop) ──grace──▶ check ──advancing──▶ correct ──verify delay──▶ verify
//!                              │                                             │
//!                              └──stopped──▶ settled ◀─────────────────────────┘
//! ```
//!
//! The corrective action (pause again, remount when the backend is known to
//! resume on its own) is taken at most once per terminal clip. A failed
//! verification is reported, never retried. Resume reports from the host
//! arriving after settlement trigger the corrective action if it has not
//! been taken yet, and otherwise only another pause.

use crate::adapter::BackendAdapter;
use crate::config::SchedulerConfig;
use core_async::time::{deadline_after, Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingCheck,
    AwaitingVerify,
    Settled,
}

/// What a guard step did.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardStep {
    /// Nothing was due.
    Idle,
    /// The first sample showed playback stopped.
    Stopped,
    /// The corrective action was taken; a verification sample is scheduled.
    Corrected { remounted: bool },
    /// Verification found playback stopped.
    Verified,
    /// Verification found playback still advancing.
    Warning(String),
    /// A resume report after the corrective action; paused again.
    Repaused,
}

/// Per-terminal-clip finalization state.
#[derive(Debug, Clone)]
pub struct FinalizationGuard {
    clip_id: String,
    epoch: u64,
    stop_sec: f64,
    tolerance_sec: f64,
    verify_delay: Duration,
    phase: Phase,
    deadline: Instant,
    corrected: bool,
    checked: bool,
}

impl FinalizationGuard {
    /// Starts the guard after the terminal pause has been issued.
    pub fn new(
        clip_id: impl Into<String>,
        epoch: u64,
        stop_sec: f64,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            clip_id: clip_id.into(),
            epoch,
            stop_sec,
            tolerance_sec: config.resume_tolerance_sec,
            verify_delay: config.verify_delay(),
            phase: Phase::AwaitingCheck,
            deadline: deadline_after(config.grace_period()),
            corrected: false,
            checked: false,
        }
    }

    pub fn clip_id(&self) -> &str {
        &self.clip_id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// When the next sample is due, or `None` once settled.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Settled => None,
            _ => Some(self.deadline),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    /// Whether the corrective action has been taken.
    pub fn corrected(&self) -> bool {
        self.corrected
    }

    /// Whether the first check (or a correction replacing it) happened.
    pub fn first_attempt_done(&self) -> bool {
        self.checked
    }

    fn still_advancing(&self, position: Option<f64>, backend: &dyn BackendAdapter) -> bool {
        match position {
            Some(position) => position > self.stop_sec + self.tolerance_sec,
            // An unreadable player that is known to resume cannot be trusted.
            None => backend.resumes_after_pause(),
        }
    }

    /// Takes the due sample, if any, and acts on it.
    pub async fn run(&mut self, backend: &dyn BackendAdapter) -> GuardStep {
        if Instant::now() < self.deadline {
            return GuardStep::Idle;
        }
        match self.phase {
            Phase::Settled => GuardStep::Idle,
            Phase::AwaitingCheck => {
                let position = backend.current_position().await;
                self.checked = true;
                if self.still_advancing(position, backend) {
                    debug!(
                        clip = %self.clip_id,
                        ?position,
                        stop = self.stop_sec,
                        "Still advancing after pause"
                    );
                    self.correct(backend).await
                } else {
                    debug!(clip = %self.clip_id, ?position, "Playback stopped at end");
                    self.phase = Phase::Settled;
                    GuardStep::Stopped
                }
            }
            Phase::AwaitingVerify => {
                let position = backend.current_position().await;
                self.phase = Phase::Settled;
                match position {
                    Some(position) if position > self.stop_sec + self.tolerance_sec => {
                        let message = format!(
                            "position {:.1}s still past stop point {:.1}s after corrective action",
                            position, self.stop_sec
                        );
                        warn!(clip = %self.clip_id, %message, "Finalization not confirmed");
                        GuardStep::Warning(message)
                    }
                    _ => GuardStep::Verified,
                }
            }
        }
    }

    /// Handles a "player started advancing" report.
    pub async fn on_resumed(&mut self, backend: &dyn BackendAdapter) -> GuardStep {
        if self.corrected {
            if let Err(e) = backend.pause().await {
                debug!(clip = %self.clip_id, error = %e, "Re-pause rejected");
            }
            return GuardStep::Repaused;
        }
        self.checked = true;
        self.correct(backend).await
    }

    async fn correct(&mut self, backend: &dyn BackendAdapter) -> GuardStep {
        self.corrected = true;
        if let Err(e) = backend.pause_at(self.stop_sec).await {
            debug!(clip = %self.clip_id, error = %e, "Corrective pause rejected");
        }

        let remounted = if backend.resumes_after_pause() {
            match backend.remount().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(clip = %self.clip_id, error = %e, "Remount failed");
                    false
                }
            }
        } else {
            false
        };

        info!(clip = %self.clip_id, remounted, "Corrective action taken at playlist end");
        self.phase = Phase::AwaitingVerify;
        self.deadline = deadline_after(self.verify_delay);
        GuardStep::Corrected { remounted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ReadyCallback;
    use crate::error::Result;
    use crate::models::{SourceKind, VideoSource};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Player whose position is scripted and which counts commands.
    #[derive(Default)]
    struct Scripted {
        positions: Mutex<Vec<Option<f64>>>,
        pauses: Mutex<usize>,
        remounts: Mutex<usize>,
        resumes: bool,
    }

    impl Scripted {
        fn new(resumes: bool, positions: Vec<Option<f64>>) -> Self {
            Self {
                positions: Mutex::new(positions),
                resumes,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl BackendAdapter for Scripted {
        fn kind(&self) -> SourceKind {
            SourceKind::Embedded
        }
        async fn load(&self, _source: &VideoSource) -> Result<()> {
            Ok(())
        }
        fn is_ready(&self) -> bool {
            true
        }
        async fn seek_and_play(&self, _seconds: f64) -> Result<()> {
            Ok(())
        }
        async fn current_position(&self) -> Option<f64> {
            let mut positions = self.positions.lock();
            if positions.is_empty() {
                None
            } else {
                positions.remove(0)
            }
        }
        async fn pause(&self) -> Result<()> {
            *self.pauses.lock() += 1;
            Ok(())
        }
        fn on_ready(&self, callback: ReadyCallback) {
            callback();
        }
        fn resumes_after_pause(&self) -> bool {
            self.resumes
        }
        async fn remount(&self) -> Result<()> {
            *self.remounts.lock() += 1;
            Ok(())
        }
    }

    fn guard() -> FinalizationGuard {
        FinalizationGuard::new("r1", 3, 15.0, &SchedulerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_happens_before_grace_period() {
        let backend = Scripted::new(true, vec![Some(20.0)]);
        let mut guard = guard();
        assert_eq!(guard.run(&backend).await, GuardStep::Idle);
        assert!(!guard.first_attempt_done());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_player_settles_without_action() {
        let backend = Scripted::new(true, vec![Some(15.2)]);
        let mut guard = guard();

        core_async::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(guard.run(&backend).await, GuardStep::Stopped);
        assert!(guard.is_settled());
        assert_eq!(guard.deadline(), None);
        assert_eq!(*backend.pauses.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn advancing_player_gets_exactly_one_correction() {
        let backend = Scripted::new(true, vec![Some(16.5), Some(17.9)]);
        let mut guard = guard();

        core_async::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(
            guard.run(&backend).await,
            GuardStep::Corrected { remounted: true }
        );
        assert!(guard.deadline().is_some());

        core_async::time::sleep(Duration::from_millis(600)).await;
        assert!(matches!(guard.run(&backend).await, GuardStep::Warning(_)));
        assert!(guard.is_settled());

        // Later resume reports only pause again.
        assert_eq!(guard.on_resumed(&backend).await, GuardStep::Repaused);
        assert_eq!(guard.on_resumed(&backend).await, GuardStep::Repaused);
        assert_eq!(*backend.remounts.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_after_clean_stop_triggers_the_single_correction() {
        let backend = Scripted::new(true, vec![Some(15.0), Some(0.0)]);
        let mut guard = guard();

        core_async::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(guard.run(&backend).await, GuardStep::Stopped);

        assert_eq!(
            guard.on_resumed(&backend).await,
            GuardStep::Corrected { remounted: true }
        );
        core_async::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(guard.run(&backend).await, GuardStep::Verified);
        assert_eq!(*backend.remounts.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_position_on_reliable_backend_is_trusted() {
        let backend = Scripted::new(false, vec![None]);
        let mut guard = guard();

        core_async::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(guard.run(&backend).await, GuardStep::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn reliable_backend_is_never_remounted() {
        let backend = Scripted::new(false, vec![Some(30.0), Some(15.0)]);
        let mut guard = guard();

        core_async::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(
            guard.run(&backend).await,
            GuardStep::Corrected { remounted: false }
        );
        assert_eq!(*backend.remounts.lock(), 0);
        assert_eq!(*backend.pauses.lock(), 1);
    }
}
