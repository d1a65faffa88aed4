//! # Scheduler Configuration
//!
//! Timing and ordering knobs for the segment scheduler.

use crate::error::{PlaybackError, Result};
use core_runtime::events::EventBus;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Segment scheduler configuration.
///
/// Every field has a serde default, so a partial JSON document (or `{}`)
/// yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds subtracted from a clip's start when seeking into it (floored at 0).
    ///
    /// Default: 0.2
    #[serde(default = "default_start_margin_sec")]
    pub start_margin_sec: f64,

    /// Seconds subtracted from a clip's end to form its stop boundary.
    /// Not applied to the last clip of a playlist.
    ///
    /// Default: 0.1
    #[serde(default = "default_end_margin_sec")]
    pub end_margin_sec: f64,

    /// Boundary watcher sampling period in milliseconds.
    ///
    /// Default: 200
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Delay between the terminal pause and the finalization sample.
    ///
    /// Default: 350
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Delay between the corrective action and the verification sample.
    ///
    /// Default: 600
    #[serde(default = "default_verify_delay_ms")]
    pub verify_delay_ms: u64,

    /// How far past the stop point (seconds) a sample may be before the
    /// backend counts as still advancing.
    ///
    /// Default: 0.8
    #[serde(default = "default_resume_tolerance_sec")]
    pub resume_tolerance_sec: f64,

    /// Window (seconds) around a clip within which a position sample shows
    /// that a seek has landed.
    ///
    /// Default: 1.0
    #[serde(default = "default_settle_tolerance_sec")]
    pub settle_tolerance_sec: f64,

    /// Samples after which the watcher stops waiting for a seek to land and
    /// accepts any readable position.
    ///
    /// Default: 5
    #[serde(default = "default_settle_max_samples")]
    pub settle_max_samples: u32,

    /// Multiplier applied to a video's `order` in the clip sort key.
    ///
    /// Default: 1 000 000
    #[serde(default = "default_order_stride")]
    pub order_stride: f64,

    /// Capacity of the event bus.
    ///
    /// Default: 100
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_margin_sec: default_start_margin_sec(),
            end_margin_sec: default_end_margin_sec(),
            tick_interval_ms: default_tick_interval_ms(),
            grace_period_ms: default_grace_period_ms(),
            verify_delay_ms: default_verify_delay_ms(),
            resume_tolerance_sec: default_resume_tolerance_sec(),
            settle_tolerance_sec: default_settle_tolerance_sec(),
            settle_max_samples: default_settle_max_samples(),
            order_stride: default_order_stride(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl SchedulerConfig {
    /// Faster sampling and shorter finalization delays.
    ///
    /// Halves boundary overshoot at the cost of twice as many position reads.
    pub fn low_latency() -> Self {
        Self {
            tick_interval_ms: 100,
            grace_period_ms: 250,
            verify_delay_ms: 400,
            ..Default::default()
        }
    }

    /// Parse a JSON document and validate the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlaybackError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("start_margin_sec", self.start_margin_sec),
            ("end_margin_sec", self.end_margin_sec),
            ("resume_tolerance_sec", self.resume_tolerance_sec),
            ("settle_tolerance_sec", self.settle_tolerance_sec),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(PlaybackError::InvalidConfig(format!(
                    "{} must be a finite value >= 0",
                    name
                )));
            }
        }

        if self.tick_interval_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "tick_interval_ms must be > 0".to_string(),
            ));
        }

        if !self.order_stride.is_finite() || self.order_stride <= 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "order_stride must be > 0".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(PlaybackError::InvalidConfig(
                "event_buffer must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }

    /// Event bus sized by `event_buffer`.
    pub fn event_bus(&self) -> EventBus {
        EventBus::new(self.event_buffer)
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_start_margin_sec() -> f64 {
    0.2
}

fn default_end_margin_sec() -> f64 {
    0.1
}

fn default_tick_interval_ms() -> u64 {
    200
}

fn default_grace_period_ms() -> u64 {
    350
}

fn default_verify_delay_ms() -> u64 {
    600
}

fn default_resume_tolerance_sec() -> f64 {
    0.8
}

fn default_settle_max_samples() -> u32 {
    5
}

fn default_settle_tolerance_sec() -> f64 {
    1.0
}

fn default_order_stride() -> f64 {
    1_000_000.0
}

fn default_event_buffer() -> usize {
    100
}
