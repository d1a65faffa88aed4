//! # Boundary Watcher
//!
//! Decides from periodic position samples when the active clip has ended.
//!
//! Neither backend can fire "position reached X", so the scheduler samples
//! the position every tick and feeds it here. A clip's boundary fires at most
//! once; the watcher has to be re-armed for the next clip.
//!
//! Right after a seek a backend may still report its previous position. A
//! sample only counts once the position has been seen inside
//! `[start - settle, stop + settle]`; until then samples are treated like
//! unreadable ones. The wait is bounded: after `settle_max_samples` samples
//! (readable or not) any readable position counts, so a clip whose first
//! readable sample is already far past its stop still ends.

use crate::models::{Clip, ClipKey};

/// Seek target for a clip: its start minus the margin, floored at zero.
pub fn start_position(clip: &Clip, start_margin_sec: f64) -> f64 {
    (clip.start_sec - start_margin_sec).max(0.0)
}

/// Position at which a clip is over.
///
/// The last clip of a playlist stops exactly at its end. Every other clip
/// stops `end_margin_sec` early, but never before its start.
pub fn stop_boundary(clip: &Clip, is_last: bool, end_margin_sec: f64) -> f64 {
    if is_last {
        clip.end_sec
    } else {
        (clip.end_sec - end_margin_sec).max(clip.start_sec)
    }
}

/// Result of feeding one sample to the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Not armed, armed for another generation, or already fired.
    Inactive,
    /// The position could not be read.
    Unreadable,
    /// The seek has not visibly landed yet.
    Unsettled,
    /// Playing inside the clip.
    Before,
    /// The boundary was reached by this sample.
    Reached,
}

/// How the watcher decides that a seek has landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settle {
    /// Slack on both sides of the clip window.
    pub tolerance_sec: f64,
    /// Samples after which any readable position is accepted.
    pub max_samples: u32,
}

impl Settle {
    pub fn new(tolerance_sec: f64, max_samples: u32) -> Self {
        Self {
            tolerance_sec,
            max_samples,
        }
    }
}

#[derive(Debug, Clone)]
struct Armed {
    clip: ClipKey,
    epoch: u64,
    start_sec: f64,
    stop_sec: f64,
    settle_sec: f64,
    settle_max_samples: u32,
    samples: u32,
    settled: bool,
    fired: bool,
}

/// Per-clip boundary detection state.
#[derive(Debug, Clone, Default)]
pub struct BoundaryWatcher {
    armed: Option<Armed>,
}

impl BoundaryWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching a clip for the given scheduler generation.
    pub fn arm(
        &mut self,
        clip: ClipKey,
        epoch: u64,
        start_sec: f64,
        stop_sec: f64,
        settle: Settle,
    ) {
        self.armed = Some(Armed {
            clip,
            epoch,
            start_sec,
            stop_sec,
            settle_sec: settle.tolerance_sec,
            settle_max_samples: settle.max_samples,
            samples: 0,
            settled: false,
            fired: false,
        });
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    /// Armed and not yet fired.
    pub fn is_active(&self) -> bool {
        self.armed.as_ref().is_some_and(|armed| !armed.fired)
    }

    pub fn clip(&self) -> Option<&ClipKey> {
        self.armed.as_ref().map(|armed| &armed.clip)
    }

    pub fn stop_sec(&self) -> Option<f64> {
        self.armed.as_ref().map(|armed| armed.stop_sec)
    }

    /// Feeds a sample taken during generation `epoch`.
    pub fn observe(&mut self, epoch: u64, position: Option<f64>) -> Observation {
        let Some(armed) = self.armed.as_mut() else {
            return Observation::Inactive;
        };
        if armed.fired || armed.epoch != epoch {
            return Observation::Inactive;
        }
        armed.samples = armed.samples.saturating_add(1);
        let Some(position) = position else {
            return Observation::Unreadable;
        };

        if !armed.settled {
            let low = armed.start_sec - armed.settle_sec;
            let high = armed.stop_sec + armed.settle_sec;
            let inside = (low..=high).contains(&position);
            if !inside && armed.samples <= armed.settle_max_samples {
                return Observation::Unsettled;
            }
            armed.settled = true;
        }

        if position >= armed.stop_sec {
            armed.fired = true;
            Observation::Reached
        } else {
            Observation::Before
        }
    }
}
